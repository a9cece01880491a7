//! Text rendering of coordinator state

use cadence_playback::{PlayerState, RepeatMode, TransportPhase};
use std::fmt::Write;
use std::time::Duration;

/// Format a duration as `m:ss`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn phase_label(phase: TransportPhase) -> &'static str {
    match phase {
        TransportPhase::Idle => "idle",
        TransportPhase::Loading => "loading",
        TransportPhase::Playing => "playing",
        TransportPhase::Paused => "paused",
    }
}

fn repeat_label(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::Off => "off",
        RepeatMode::All => "all",
        RepeatMode::One => "one",
    }
}

/// One-screen status summary
pub fn format_status(
    state: &PlayerState,
    favorite: bool,
    sleep_remaining: Option<Duration>,
) -> String {
    let transport = &state.transport;
    let mut out = String::new();

    match (&state.current_track, state.current_index) {
        (Some(track), Some(index)) => {
            let _ = writeln!(
                out,
                "[{}] {}/{} {}{}",
                phase_label(transport.phase),
                index + 1,
                state.playlist.len(),
                track,
                if favorite { " *" } else { "" }
            );
            let _ = writeln!(
                out,
                "    {} / {}",
                format_duration(transport.progress.position),
                format_duration(transport.progress.duration)
            );
        }
        _ => {
            let _ = writeln!(out, "[{}] nothing loaded", phase_label(transport.phase));
        }
    }

    let _ = write!(
        out,
        "    shuffle {}, repeat {}",
        if transport.shuffle_enabled { "on" } else { "off" },
        repeat_label(transport.repeat_mode)
    );
    if let Some(remaining) = sleep_remaining {
        let _ = write!(out, ", sleeping in {}", format_duration(remaining));
    }
    if let Some(err) = &state.last_error {
        let _ = write!(out, "\n    error: {}", err);
    }
    out
}

/// Numbered playlist with the current track marked
pub fn format_playlist(state: &PlayerState) -> String {
    if state.playlist.is_empty() {
        return "Playlist is empty".to_string();
    }

    let mut lines: Vec<String> = state
        .playlist
        .iter()
        .enumerate()
        .map(|(index, track)| {
            let marker = if state.current_index == Some(index) { ">" } else { " " };
            format!("{} {:>2}. {}", marker, index + 1, track)
        })
        .collect();
    for track in &state.unplayable {
        lines.push(format!("   --  {} (unplayable)", track));
    }
    lines.join("\n")
}

/// Notices worth printing when the snapshot moves from `previous` to `current`
pub fn describe_change(previous: &PlayerState, current: &PlayerState) -> Vec<String> {
    let mut notices = Vec::new();

    if current.current_track != previous.current_track {
        if let Some(track) = &current.current_track {
            notices.push(format!("Now playing: {}", track));
        }
    }

    if current.playlist != previous.playlist && !current.unplayable.is_empty() {
        notices.push(format!(
            "Skipped {} unplayable track(s)",
            current.unplayable.len()
        ));
    }

    let was = &previous.transport;
    let now = &current.transport;
    if now.shuffle_enabled != was.shuffle_enabled {
        notices.push(format!(
            "Shuffle {}",
            if now.shuffle_enabled { "on" } else { "off" }
        ));
    }
    if now.repeat_mode != was.repeat_mode {
        notices.push(format!("Repeat {}", repeat_label(now.repeat_mode)));
    }
    if now.phase != was.phase && matches!(now.phase, TransportPhase::Paused | TransportPhase::Idle)
    {
        notices.push(format!("Playback {}", phase_label(now.phase)));
    }

    if current.last_error != previous.last_error {
        if let Some(err) = &current.last_error {
            notices.push(format!("Error: {}", err));
        }
    }

    notices
}

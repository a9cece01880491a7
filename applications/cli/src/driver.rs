//! Applies interactive commands to a running coordinator

use crate::commands::{Command, HELP};
use crate::display::{format_duration, format_playlist, format_status};
use cadence_core::{Collections, Favorites};
use cadence_playback::{PlaybackCoordinator, SleepTimer};

/// Result of applying one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Keep reading commands, printing the reply if any
    Continue(Option<String>),

    /// Stop the session
    Quit,
}

/// Interactive session state around a coordinator
#[derive(Debug)]
pub struct Driver {
    coordinator: PlaybackCoordinator,
    favorites: Favorites,
    collections: Collections,
    timer: SleepTimer,
}

impl Driver {
    pub fn new(coordinator: PlaybackCoordinator) -> Self {
        Self {
            timer: SleepTimer::new(coordinator.clone()),
            coordinator,
            favorites: Favorites::new(),
            collections: Collections::new(),
        }
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn sleep_timer(&self) -> &SleepTimer {
        &self.timer
    }

    /// Apply `command`; transport commands reply through state changes
    pub fn handle(&mut self, command: Command) -> Outcome {
        let reply = match command {
            Command::Play(position) => {
                let len = self.coordinator.state().playlist.len();
                if position == 0 || position > len {
                    Some(format!("No track {} (playlist has {})", position, len))
                } else {
                    self.coordinator.play_at(position - 1);
                    None
                }
            }
            Command::Toggle => {
                self.coordinator.toggle_play_pause();
                None
            }
            Command::Pause => {
                self.coordinator.pause();
                None
            }
            Command::Resume => {
                self.coordinator.play();
                None
            }
            Command::Next => {
                self.coordinator.next();
                None
            }
            Command::Previous => {
                self.coordinator.previous();
                None
            }
            Command::Seek(position) => {
                self.coordinator.seek(position);
                None
            }
            Command::Shuffle => {
                self.coordinator.toggle_shuffle();
                None
            }
            Command::Repeat => {
                self.coordinator.cycle_repeat_mode();
                None
            }
            Command::Sleep(delay) => {
                if self.timer.start(delay) {
                    Some(format!("Sleep timer set for {}", format_duration(delay)))
                } else {
                    Some("Sleep delay is too long".to_string())
                }
            }
            Command::Wake => {
                if self.timer.is_active() {
                    self.timer.cancel();
                    Some("Sleep timer cancelled".to_string())
                } else {
                    Some("No sleep timer running".to_string())
                }
            }
            Command::Favorite => Some(self.toggle_favorite()),
            Command::Collect(name) => Some(self.collect(&name)),
            Command::Uncollect(name) => Some(self.uncollect(&name)),
            Command::Collections => Some(self.describe_collections()),
            Command::List => Some(format_playlist(&self.coordinator.state())),
            Command::Status => {
                let state = self.coordinator.state();
                let favorite = state
                    .current_track
                    .as_ref()
                    .is_some_and(|track| self.favorites.contains(track));
                Some(format_status(&state, favorite, self.timer.remaining()))
            }
            Command::Clear => {
                self.coordinator.clear_error();
                None
            }
            Command::Help => Some(HELP.to_string()),
            Command::Quit => {
                self.timer.cancel();
                return Outcome::Quit;
            }
        };
        Outcome::Continue(reply)
    }

    fn toggle_favorite(&mut self) -> String {
        let Some(track) = self.coordinator.state().current_track else {
            return "Nothing is playing".to_string();
        };
        if self.favorites.toggle(&track) {
            format!("Added {} to favorites", track)
        } else {
            format!("Removed {} from favorites", track)
        }
    }

    fn collect(&mut self, name: &str) -> String {
        let Some(track) = self.coordinator.state().current_track else {
            return "Nothing is playing".to_string();
        };
        match self.collections.add(name, track.clone()) {
            Ok(true) => format!("Added {} to {}", track, name),
            Ok(false) => format!("{} is already in {}", track, name),
            Err(e) => e.to_string(),
        }
    }

    fn uncollect(&mut self, name: &str) -> String {
        let Some(track) = self.coordinator.state().current_track else {
            return "Nothing is playing".to_string();
        };
        if self.collections.remove(name, &track) > 0 {
            format!("Removed {} from {}", track, name)
        } else {
            format!("{} is not in {}", track, name)
        }
    }

    fn describe_collections(&self) -> String {
        let names = self.collections.names();
        if names.is_empty() {
            return "No collections".to_string();
        }
        names
            .iter()
            .map(|name| format!("{} ({})", name, self.collections.tracks(name).len()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

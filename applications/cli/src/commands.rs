//! Interactive line commands

use crate::error::{CliError, Result};
use std::time::Duration;

/// Help text for the interactive driver
pub const HELP: &str = "\
Commands:
  play <n>      play track n of the playlist (1-based)
  toggle        play/pause
  pause         pause playback
  resume        resume playback
  next          skip forward
  prev          skip back
  seek <secs>   jump to a position in the current track
  shuffle       toggle shuffle
  repeat        cycle repeat mode (off, all, one)
  sleep <secs>  pause after a delay
  wake          cancel the sleep timer
  fav           toggle the current track as a favorite
  collect <c>   add the current track to collection c
  uncollect <c> remove the current track from collection c
  collections   list collections
  list          show the playlist
  status        show what is playing
  clear         dismiss the last error
  help          show this help
  quit          stop playback and exit";

/// Parsed interactive command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Play track at a 1-based playlist position
    Play(usize),
    Toggle,
    Pause,
    Resume,
    Next,
    Previous,
    Seek(Duration),
    Shuffle,
    Repeat,
    Sleep(Duration),
    Wake,
    Favorite,
    /// Add the current track to a named collection
    Collect(String),
    /// Remove the current track from a named collection
    Uncollect(String),
    Collections,
    List,
    Status,
    Clear,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };
        let argument = words.next();
        if let Some(extra) = words.next() {
            return Err(CliError::InvalidCommand(format!(
                "unexpected argument \"{}\"",
                extra
            )));
        }

        let command = match (word.to_lowercase().as_str(), argument) {
            ("play" | "p", Some(arg)) => Command::Play(parse_position(arg)?),
            ("toggle" | "t", None) => Command::Toggle,
            ("pause", None) => Command::Pause,
            ("resume" | "play", None) => Command::Resume,
            ("next" | "n", None) => Command::Next,
            ("prev" | "previous", None) => Command::Previous,
            ("seek", Some(arg)) => Command::Seek(parse_seconds(arg)?),
            ("shuffle", None) => Command::Shuffle,
            ("repeat", None) => Command::Repeat,
            ("sleep", Some(arg)) => Command::Sleep(parse_seconds(arg)?),
            ("wake", None) => Command::Wake,
            ("fav" | "favorite", None) => Command::Favorite,
            ("collect", Some(name)) => Command::Collect(name.to_string()),
            ("uncollect", Some(name)) => Command::Uncollect(name.to_string()),
            ("collections", None) => Command::Collections,
            ("list" | "ls", None) => Command::List,
            ("status" | "s", None) => Command::Status,
            ("clear", None) => Command::Clear,
            ("help" | "?", None) => Command::Help,
            ("quit" | "exit" | "q", None) => Command::Quit,
            ("seek" | "sleep", None) => {
                return Err(CliError::InvalidCommand(format!(
                    "{} needs a number of seconds",
                    word
                )))
            }
            ("collect" | "uncollect", None) => {
                return Err(CliError::InvalidCommand(format!(
                    "{} needs a collection name",
                    word
                )))
            }
            (_, Some(arg)) if is_known(word) => {
                return Err(CliError::InvalidCommand(format!(
                    "{} takes no argument, got \"{}\"",
                    word, arg
                )))
            }
            _ => {
                return Err(CliError::InvalidCommand(format!(
                    "unknown command \"{}\" (try help)",
                    word
                )))
            }
        };

        Ok(Some(command))
    }
}

fn is_known(word: &str) -> bool {
    HELP.lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .any(|name| name.eq_ignore_ascii_case(word))
}

fn parse_position(arg: &str) -> Result<usize> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CliError::InvalidCommand(format!(
            "\"{}\" is not a track number",
            arg
        ))),
    }
}

fn parse_seconds(arg: &str) -> Result<Duration> {
    arg.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| CliError::InvalidCommand(format!("\"{}\" is not a number of seconds", arg)))
}

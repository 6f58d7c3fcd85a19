//! Text commands accepted on stdin.

use cadence_core::{Error, Result, TrackId};

/// A parsed front-end command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List { genre: Option<String> },
    Search { query: String },
    Genres,
    Top { limit: usize },
    Play { id: TrackId },
    Toggle,
    Pause,
    Resume,
    Next,
    Previous,
    Seek { seconds: f64 },
    Volume { level: f32 },
    Mute,
    Shuffle,
    Repeat,
    Status,
    Help,
    Quit,
}

const DEFAULT_TOP_LIMIT: usize = 5;

pub const HELP: &str = "\
commands:
  list [genre]    list tracks, optionally by genre
  search <text>   search title, artist and album
  genres          list genres
  top [n]         most played tracks
  play <id>       play a track from the last listing
  toggle | pause | resume
  next | prev
  seek <secs>     jump within the current track
  vol <0..1>      set volume
  mute            toggle mute
  shuffle         toggle shuffle
  repeat          toggle repeat-one
  status          show what is playing
  quit";

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word.to_lowercase().as_str() {
            "list" | "ls" => Self::List {
                genre: (!rest.is_empty()).then(|| rest.to_string()),
            },
            "search" | "find" => {
                if rest.is_empty() {
                    return Err(Error::InvalidArgument("search needs a query".to_string()));
                }
                Self::Search {
                    query: rest.to_string(),
                }
            }
            "genres" => Self::Genres,
            "top" => Self::Top {
                limit: if rest.is_empty() {
                    DEFAULT_TOP_LIMIT
                } else {
                    parse_number(rest)?
                },
            },
            "play" => {
                if rest.is_empty() {
                    return Err(Error::InvalidArgument("play needs a track id".to_string()));
                }
                Self::Play {
                    id: TrackId::new(rest),
                }
            }
            "toggle" | "p" => Self::Toggle,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "next" | "n" => Self::Next,
            "prev" | "previous" => Self::Previous,
            "seek" => Self::Seek {
                seconds: parse_number(rest)?,
            },
            "vol" | "volume" => Self::Volume {
                level: parse_number(rest)?,
            },
            "mute" => Self::Mute,
            "shuffle" => Self::Shuffle,
            "repeat" => Self::Repeat,
            "status" | "" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(Error::InvalidArgument(format!("unknown command: {other}"))),
        };
        Ok(command)
    }
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T> {
    text.parse()
        .map_err(|_| Error::InvalidArgument(format!("not a number: {text:?}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("next").unwrap(), Command::Next);
        assert_eq!(Command::parse("  PREV ").unwrap(), Command::Previous);
        assert_eq!(Command::parse("").unwrap(), Command::Status);
        assert_eq!(Command::parse("q").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            Command::parse("list Hip-Hop").unwrap(),
            Command::List {
                genre: Some("Hip-Hop".into())
            }
        );
        assert_eq!(Command::parse("list").unwrap(), Command::List { genre: None });
        assert_eq!(
            Command::parse("search hotel california").unwrap(),
            Command::Search {
                query: "hotel california".into()
            }
        );
        assert_eq!(
            Command::parse("play 3").unwrap(),
            Command::Play {
                id: TrackId::new("3")
            }
        );
        assert_eq!(Command::parse("seek 42.5").unwrap(), Command::Seek { seconds: 42.5 });
        assert_eq!(Command::parse("vol 0.4").unwrap(), Command::Volume { level: 0.4 });
        assert_eq!(Command::parse("top").unwrap(), Command::Top { limit: 5 });
        assert_eq!(Command::parse("top 2").unwrap(), Command::Top { limit: 2 });
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("seek soon").is_err());
        assert!(Command::parse("play").is_err());
        assert!(Command::parse("search").is_err());
        assert!(Command::parse("dance").is_err());
    }
}

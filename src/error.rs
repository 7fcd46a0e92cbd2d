// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Error type shared by every layer of the crate.
//!
//! Errors here are not meant to be recovered from below the process entry point.
//! A card stack or scheduler that saw one of them is in an unknown state, so the
//! driving loop stops and hands the error up.

use crate::card::CardId;
use std::io;

/// Result alias used across the crate
pub type DeckResult<T> = Result<T, DeckError>;

#[derive(Debug)]
pub enum DeckError {
    /// pop() was asked to remove a card that is not the frontmost one
    NotFrontmost { card: CardId, top: Option<CardId> },
    /// no pending event and no timer, the loop would wait forever
    Stalled,
    /// input protocol violation, e.g. a strict tracker saw a key go down twice
    Input(String),
    /// backend construction failed (window, context, shader...)
    Setup(String),
    /// filesystem error while writing snapshots or replays
    Io(io::Error),
    /// image decode/encode error
    Image(String),
    /// malformed replay data
    Replay(String),
    /// unreadable config file
    Config(String),
}

impl std::fmt::Display for DeckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeckError::NotFrontmost { card, top: Some(top) } => {
                write!(f, "Can't pop card {}: card {} is frontmost", card, top)
            }
            DeckError::NotFrontmost { card, top: None } => {
                write!(f, "Can't pop card {}: card stack is empty", card)
            }
            DeckError::Stalled => write!(f, "Event heap empty and timer not set to fire"),
            DeckError::Input(msg) => write!(f, "Input error: {}", msg),
            DeckError::Setup(msg) => write!(f, "Video driver setup failed: {}", msg),
            DeckError::Io(e) => write!(f, "IO error: {}", e),
            DeckError::Image(msg) => write!(f, "Image error: {}", msg),
            DeckError::Replay(msg) => write!(f, "Replay error: {}", msg),
            DeckError::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for DeckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeckError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DeckError {
    fn from(e: io::Error) -> Self {
        DeckError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = DeckError::NotFrontmost {
            card: CardId(3),
            top: Some(CardId(5)),
        };
        assert_eq!(e.to_string(), "Can't pop card #3: card #5 is frontmost");
        assert_eq!(
            DeckError::Stalled.to_string(),
            "Event heap empty and timer not set to fire"
        );
    }

    #[test]
    fn test_from_io() {
        let e: DeckError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(e, DeckError::Io(_)));
        assert!(std::error::Error::source(&e).is_some());
    }
}

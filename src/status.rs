//! Status Tracking Module
//!
//! Every cached object lives under two keys: the primary key holding the
//! payload and a derived status key (`<key>/status`) holding one of four
//! freshness tokens. This module owns the key derivation, the token
//! encoding and the transition table.

use std::fmt;

use serde::Serialize;

/// Suffix appended to a primary key to form its status key.
pub const STATUS_SUFFIX: &str = "/status";

// == Status ==
/// Freshness state of a cached object.
///
/// The stored encoding is a single ASCII digit and must stay byte-for-byte
/// stable: `"0"` Empty, `"1"` Unchecked, `"2"` Checked, `"3"` Dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The key does not exist. Returned to callers, never stored.
    Empty,
    /// Written but not yet consumed.
    Unchecked,
    /// The consumer has acknowledged the current value.
    Checked,
    /// A second write landed before the first was checked.
    Dirty,
}

impl Status {
    /// Wire token for this status.
    pub fn as_token(&self) -> &'static str {
        match self {
            Status::Empty => "0",
            Status::Unchecked => "1",
            Status::Checked => "2",
            Status::Dirty => "3",
        }
    }

    /// Parses a wire token. Unknown bytes yield `None`.
    pub fn from_token(raw: &[u8]) -> Option<Self> {
        match raw {
            b"0" => Some(Status::Empty),
            b"1" => Some(Status::Unchecked),
            b"2" => Some(Status::Checked),
            b"3" => Some(Status::Dirty),
            _ => None,
        }
    }

    /// Decodes a stored status value.
    ///
    /// `Empty` is never a legal stored value, so it is treated the same as a
    /// missing or garbled status key: untracked.
    pub fn decode_stored(raw: Option<&[u8]>) -> Option<Self> {
        match raw.and_then(Status::from_token) {
            Some(Status::Empty) | None => None,
            tracked => tracked,
        }
    }

    // == Transitions ==
    /// Status to store after a write.
    ///
    /// `current` is `None` when the key is absent or its status is untracked.
    /// A write on top of an unconsumed write marks the entry dirty; any other
    /// write starts a fresh unchecked cycle.
    pub fn after_write(current: Option<Status>) -> Status {
        match current {
            Some(Status::Unchecked) => Status::Dirty,
            _ => Status::Unchecked,
        }
    }

    /// Status to store after a check, or `None` when no write is needed.
    pub fn after_check(current: Option<Status>) -> Option<Status> {
        match current {
            Some(Status::Checked) => None,
            _ => Some(Status::Checked),
        }
    }

    /// Returns true when the entry holds an unconsumed overwrite.
    pub fn is_dirty(&self) -> bool {
        matches!(self, Status::Dirty)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Empty => "empty",
            Status::Unchecked => "unchecked",
            Status::Checked => "checked",
            Status::Dirty => "dirty",
        };
        f.write_str(name)
    }
}

/// Derives the status key for a primary key.
pub fn status_key(key: &str) -> String {
    format!("{key}{STATUS_SUFFIX}")
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_key_suffix() {
        assert_eq!(status_key("students/3"), "students/3/status");
        assert_eq!(status_key("k"), "k/status");
    }

    #[test]
    fn test_token_encoding_is_stable() {
        assert_eq!(Status::Empty.as_token(), "0");
        assert_eq!(Status::Unchecked.as_token(), "1");
        assert_eq!(Status::Checked.as_token(), "2");
        assert_eq!(Status::Dirty.as_token(), "3");
    }

    #[test]
    fn test_token_parse() {
        for status in [Status::Empty, Status::Unchecked, Status::Checked, Status::Dirty] {
            assert_eq!(Status::from_token(status.as_token().as_bytes()), Some(status));
        }
        assert_eq!(Status::from_token(b"4"), None);
        assert_eq!(Status::from_token(b""), None);
        assert_eq!(Status::from_token(b"11"), None);
    }

    #[test]
    fn test_decode_stored_rejects_empty() {
        assert_eq!(Status::decode_stored(Some(b"0".as_slice())), None);
        assert_eq!(Status::decode_stored(None), None);
        assert_eq!(Status::decode_stored(Some(b"x".as_slice())), None);
        assert_eq!(Status::decode_stored(Some(b"3".as_slice())), Some(Status::Dirty));
    }

    #[test]
    fn test_after_write() {
        assert_eq!(Status::after_write(None), Status::Unchecked);
        assert_eq!(Status::after_write(Some(Status::Unchecked)), Status::Dirty);
        assert_eq!(Status::after_write(Some(Status::Checked)), Status::Unchecked);
        assert_eq!(Status::after_write(Some(Status::Dirty)), Status::Unchecked);
    }

    #[test]
    fn test_after_check() {
        assert_eq!(Status::after_check(Some(Status::Checked)), None);
        assert_eq!(Status::after_check(Some(Status::Unchecked)), Some(Status::Checked));
        assert_eq!(Status::after_check(Some(Status::Dirty)), Some(Status::Checked));
        assert_eq!(Status::after_check(None), Some(Status::Checked));
    }

    #[test]
    fn test_display_and_serialize() {
        assert_eq!(Status::Dirty.to_string(), "dirty");
        let json = serde_json::to_string(&Status::Unchecked).unwrap();
        assert_eq!(json, "\"unchecked\"");
    }
}

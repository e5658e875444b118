/// Page state definitions
///
/// Every recorded page ends in exactly one of these states. Only `Processed`
/// pages carry extracted content; the others are sentinels that keep the
/// page out of later traversals.
use std::fmt;

/// How a recorded page ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Page was fetched and its content extracted
    Processed,

    /// Site refused access (HTTP 403, or the render worker answered 500)
    Forbidden,

    /// robots.txt disallows the page; it was never fetched
    Disallowed,

    /// Page returned HTTP 404
    DeadLink,
}

impl PageState {
    pub const ALL: [PageState; 4] = [
        Self::Processed,
        Self::Forbidden,
        Self::Disallowed,
        Self::DeadLink,
    ];

    /// Returns true if this is one of the sentinel states
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Processed)
    }

    /// Status code stored for a sentinel page
    pub fn sentinel_status(&self) -> Option<u16> {
        match self {
            Self::Processed => None,
            Self::Forbidden | Self::Disallowed => Some(403),
            Self::DeadLink => Some(404),
        }
    }

    /// Converts the page state to its database representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Forbidden => "forbidden",
            Self::Disallowed => "disallowed",
            Self::DeadLink => "dead_link",
        }
    }

    /// Parses a page state from its database representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "processed" => Some(Self::Processed),
            "forbidden" => Some(Self::Forbidden),
            "disallowed" => Some(Self::Disallowed),
            "dead_link" => Some(Self::DeadLink),
            _ => None,
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

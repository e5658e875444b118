use crate::robots::RobotsPolicy;
use url::Url;

/// What is known about a website's robots.txt
///
/// Persisted on the website row so later runs don't fetch it again.
#[derive(Debug, Clone, PartialEq)]
pub enum RobotsState {
    /// Never fetched
    Unknown,
    /// Fetched; `None` means missing, empty or oversized (no policy)
    Fetched(Option<String>),
    /// The fetch failed; the site is treated as having no policy
    Failed,
}

impl RobotsState {
    /// Rebuilds the state from the `robots_fetched`, `robots_failed` and
    /// `robots_body` columns
    pub fn from_columns(fetched: bool, failed: bool, body: Option<String>) -> Self {
        match (fetched, failed) {
            (_, true) => Self::Failed,
            (true, false) => Self::Fetched(body),
            (false, false) => Self::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Fetched(Some(body)) => Some(body),
            _ => None,
        }
    }

    /// Resolves the policy for `agent`; anything but a stored body allows all
    pub fn policy(&self, origin: &Url, agent: &str) -> RobotsPolicy {
        match self.body() {
            Some(body) => RobotsPolicy::from_content(origin, body, agent),
            None => RobotsPolicy::allow_all(origin),
        }
    }
}

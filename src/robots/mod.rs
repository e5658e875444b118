//! Robots.txt handling module
//!
//! This module fetches robots.txt, parses it into agent groups and resolves
//! the allowed/disallowed prefixes the crawler obeys. Anything that goes wrong
//! along the way degrades to "no policy", never to an error.

mod parser;
mod policy;
mod state;

pub use parser::{parse_robots, RobotsGroup, RobotsParser};
pub use policy::RobotsPolicy;
pub use state::RobotsState;

use crate::crawler::{RobotsFetch, Transport};
use url::Url;

/// Fetches robots.txt for the site at `origin`
///
/// # Arguments
///
/// * `transport` - Transport used for the request
/// * `origin` - Any URL of the site; only its origin is used
/// * `max_size` - Bodies longer than this many bytes are ignored
///
/// # Returns
///
/// The state to persist for the site. Missing, empty and oversized files
/// are `Fetched(None)`; transport failures are `Failed`.
pub async fn fetch_robots(transport: &dyn Transport, origin: &Url, max_size: usize) -> RobotsState {
    match transport.fetch_robots_txt(origin, max_size).await {
        RobotsFetch::Body(body) if body.trim().is_empty() => {
            tracing::debug!("Empty robots.txt for {}", origin);
            RobotsState::Fetched(None)
        }
        RobotsFetch::Body(body) if body.len() > max_size => {
            tracing::debug!(
                "Ignoring robots.txt for {} ({} bytes > {})",
                origin,
                body.len(),
                max_size
            );
            RobotsState::Fetched(None)
        }
        RobotsFetch::Body(body) => RobotsState::Fetched(Some(body)),
        RobotsFetch::TooLarge(size) => {
            tracing::debug!(
                "Ignoring robots.txt for {} ({} bytes > {})",
                origin,
                size,
                max_size
            );
            RobotsState::Fetched(None)
        }
        RobotsFetch::NotFound => RobotsState::Fetched(None),
        RobotsFetch::Failed(error) => {
            tracing::warn!("Failed to fetch robots.txt for {}: {}", origin, error);
            RobotsState::Failed
        }
    }
}

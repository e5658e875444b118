use crate::robots::parser::{parse_robots, RobotsGroup};
use std::time::Duration;
use url::Url;

/// Upper bound on a site-requested crawl delay
const MAX_CRAWL_DELAY: Duration = Duration::from_secs(10);

/// Allowed and disallowed URL prefixes for one site and agent
#[derive(Debug, Clone, PartialEq)]
pub struct RobotsPolicy {
    allowed: Vec<String>,
    disallowed: Vec<String>,
    crawl_delay: Option<Duration>,
}

/// Prefix lists resolved for a single agent token
#[derive(Debug, Default)]
struct AgentPaths {
    allowed: Vec<String>,
    disallowed: Vec<String>,
    fully_allowed: bool,
    crawl_delay: Option<f64>,
}

impl RobotsPolicy {
    /// Policy that allows every path of the site
    pub fn allow_all(origin: &Url) -> Self {
        Self {
            allowed: vec![root_of(origin)],
            disallowed: Vec::new(),
            crawl_delay: None,
        }
    }

    /// Parses a robots.txt body and resolves it for `agent`
    pub fn from_content(origin: &Url, content: &str, agent: &str) -> Self {
        Self::from_groups(origin, &parse_robots(content), agent)
    }

    /// Resolves parsed groups for `agent`, falling back to the wildcard group
    ///
    /// When the agent has its own group, wildcard disallows still apply unless
    /// the agent's group explicitly allows the same path or allows everything.
    pub fn from_groups(origin: &Url, groups: &[RobotsGroup], agent: &str) -> Self {
        let agent = agent.to_lowercase();
        let wildcard = resolve_agent(origin, groups, "*");

        let has_specific = agent != "*" && groups.iter().any(|g| g.agent == agent);
        if !has_specific {
            return Self::from_paths(wildcard);
        }

        let mut specific = resolve_agent(origin, groups, &agent);
        if !specific.fully_allowed {
            for inherited in wildcard.disallowed {
                let overridden = specific.allowed.contains(&inherited);
                if !overridden && !specific.disallowed.contains(&inherited) {
                    specific.disallowed.push(inherited);
                }
            }
        }
        if specific.crawl_delay.is_none() {
            specific.crawl_delay = wildcard.crawl_delay;
        }

        Self::from_paths(specific)
    }

    fn from_paths(paths: AgentPaths) -> Self {
        Self {
            allowed: paths.allowed,
            disallowed: paths.disallowed,
            crawl_delay: paths
                .crawl_delay
                .map(|secs| Duration::from_secs_f64(secs).min(MAX_CRAWL_DELAY)),
        }
    }

    /// Checks a URL against the prefixes; the longest match wins and ties go to allow
    pub fn is_allowed(&self, url: &Url) -> bool {
        let target = url.as_str().to_lowercase();
        let longest = |prefixes: &[String]| {
            prefixes
                .iter()
                .filter(|p| target.starts_with(p.as_str()))
                .map(|p| p.len())
                .max()
        };

        match (longest(&self.allowed), longest(&self.disallowed)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn disallowed(&self) -> &[String] {
        &self.disallowed
    }

    /// Crawl delay requested by the site, capped at ten seconds
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay
    }
}

/// Collects the prefixes of every group matching `agent`
fn resolve_agent(origin: &Url, groups: &[RobotsGroup], agent: &str) -> AgentPaths {
    let root = root_of(origin);
    let selected: Vec<&RobotsGroup> = groups.iter().filter(|g| g.agent == agent).collect();

    let fully_allowed = || AgentPaths {
        allowed: vec![root.clone()],
        disallowed: Vec::new(),
        fully_allowed: true,
        crawl_delay: None,
    };

    if selected.is_empty() {
        return fully_allowed();
    }

    let mut paths = AgentPaths::default();
    for group in &selected {
        if paths.crawl_delay.is_none() {
            paths.crawl_delay = group.crawl_delay;
        }
        if group.disallow.is_empty() {
            let crawl_delay = paths.crawl_delay;
            return AgentPaths {
                crawl_delay,
                ..fully_allowed()
            };
        }
        for path in &group.allow {
            push_unique(&mut paths.allowed, prefix_for(origin, path));
        }
        for path in &group.disallow {
            push_unique(&mut paths.disallowed, prefix_for(origin, path));
        }
    }

    if paths.allowed.is_empty() && !paths.disallowed.contains(&root) {
        paths.allowed.push(root);
    }

    paths
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// `origin + path` with wildcards stripped and a leading slash ensured
fn prefix_for(origin: &Url, path: &str) -> String {
    let path = path.replace('*', "");
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    };
    format!("{}{}", origin.origin().ascii_serialization(), path)
}

fn root_of(origin: &Url) -> String {
    format!("{}/", origin.origin().ascii_serialization())
}

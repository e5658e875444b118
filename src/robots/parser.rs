//! Line-oriented robots.txt parser
//!
//! Parsing is an explicit state machine: the parser remembers which group is
//! currently open and attaches allow/disallow lines to it.

/// Rules declared for one user-agent
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RobotsGroup {
    /// Lower-cased agent token (`*` for the wildcard group)
    pub agent: String,
    pub allow: Vec<String>,
    pub disallow: Vec<String>,
    /// `Crawl-delay` in seconds, if declared
    pub crawl_delay: Option<f64>,
}

impl RobotsGroup {
    fn new(agent: &str) -> Self {
        Self {
            agent: agent.to_string(),
            ..Default::default()
        }
    }
}

/// Parser state: the group currently receiving rules and every group seen
#[derive(Debug, Default)]
pub struct RobotsParser {
    current: Option<usize>,
    groups: Vec<RobotsGroup>,
}

impl RobotsParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one line of robots.txt
    ///
    /// Lines are lower-cased and stripped of `#` comments. A `user-agent`
    /// line opens a new group unless it names the agent of the group already
    /// open. Rules seen before any group open an implicit wildcard group.
    pub fn feed_line(&mut self, line: &str) {
        let line = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        };
        let line = line.trim().to_lowercase();
        if line.is_empty() {
            return;
        }

        let Some((key, value)) = line.split_once(':') else {
            return;
        };
        let value = value.trim();

        match key.trim() {
            "user-agent" => {
                if value.is_empty() {
                    return;
                }
                let same_agent = self
                    .current
                    .map(|idx| self.groups[idx].agent == value)
                    .unwrap_or(false);
                if !same_agent {
                    self.groups.push(RobotsGroup::new(value));
                    self.current = Some(self.groups.len() - 1);
                }
            }
            "allow" if !value.is_empty() => {
                self.current_group().allow.push(value.to_string());
            }
            "disallow" if !value.is_empty() => {
                self.current_group().disallow.push(value.to_string());
            }
            "crawl-delay" => {
                if let Ok(delay) = value.parse::<f64>() {
                    if delay.is_finite() && delay >= 0.0 {
                        self.current_group().crawl_delay = Some(delay);
                    }
                }
            }
            // sitemap, host, empty allow/disallow and unknown directives
            _ => {}
        }
    }

    fn current_group(&mut self) -> &mut RobotsGroup {
        let idx = match self.current {
            Some(idx) => idx,
            None => {
                self.groups.push(RobotsGroup::new("*"));
                let idx = self.groups.len() - 1;
                self.current = Some(idx);
                idx
            }
        };
        &mut self.groups[idx]
    }

    pub fn finish(self) -> Vec<RobotsGroup> {
        self.groups
    }
}

/// Parses a whole robots.txt body into its groups
pub fn parse_robots(content: &str) -> Vec<RobotsGroup> {
    let mut parser = RobotsParser::new();
    for line in content.lines() {
        parser.feed_line(line);
    }
    parser.finish()
}

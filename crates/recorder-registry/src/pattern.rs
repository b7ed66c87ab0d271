//! Trace patterns: a compiled regex plus whether it turns matching channels
//! on or off, so channels registered after a configuration clause was
//! applied still pick it up (spec.md §4.3's per-channel state machine).

use regex::Regex;

pub(crate) struct TracePattern {
    pub(crate) source: String,
    pub(crate) regex: Regex,
    pub(crate) traced: bool,
}

impl TracePattern {
    pub(crate) fn compile(source: &str, traced: bool) -> Result<Self, regex::Error> {
        let regex = Regex::new(&anchor(source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
            traced,
        })
    }

    pub(crate) fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// spec.md §4.3's clauses name whole channels, not substrings of them —
/// `"http_error"` must not also match `"http_error_rate"`. Anchor every
/// pattern unless the author already anchored it themselves.
fn anchor(source: &str) -> String {
    let start = source.starts_with('^');
    let end = source.ends_with('$');
    match (start, end) {
        (true, true) => source.to_string(),
        (true, false) => format!("{source}$"),
        (false, true) => format!("^{source}"),
        (false, false) => format!("^{source}$"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_name_anchoring_avoids_prefix_collisions() {
        let p = TracePattern::compile(".*_error", true).unwrap();
        assert!(p.matches("http_error"));
        assert!(!p.matches("http_error_rate"));
    }

    #[test]
    fn already_anchored_patterns_are_left_alone() {
        let p = TracePattern::compile("^db_.*$", true).unwrap();
        assert!(p.matches("db_error"));
        assert!(!p.matches("xdb_error"));
    }
}

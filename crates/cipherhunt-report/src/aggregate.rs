//! Owner to classified path index.

use std::collections::{BTreeMap, BTreeSet};

use cipherhunt_core::Owner;

use crate::report::Report;

/// Collects classified paths grouped by owner.
///
/// Both levels are ordered sets, so insertion order never leaks into the
/// rendered report.
#[derive(Debug, Default, Clone)]
pub struct Aggregator {
    index: BTreeMap<Owner, BTreeSet<String>>,
}

impl Aggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a classified path under `owner`.
    ///
    /// Returns `false` if the owner already listed this path.
    pub fn record(&mut self, owner: Owner, path: impl Into<String>) -> bool {
        self.index.entry(owner).or_default().insert(path.into())
    }

    /// Number of distinct owners.
    pub fn owner_count(&self) -> usize {
        self.index.len()
    }

    /// Total number of recorded paths across all owners.
    pub fn path_count(&self) -> usize {
        self.index.values().map(BTreeSet::len).sum()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check if `owner` has `path` recorded.
    pub fn contains(&self, owner: &Owner, path: &str) -> bool {
        self.index
            .get(owner)
            .is_some_and(|paths| paths.contains(path))
    }

    /// Iterate owners and their paths in report order.
    pub fn iter(&self) -> impl Iterator<Item = (&Owner, &BTreeSet<String>)> {
        self.index.iter()
    }

    /// Consume the aggregator and render the final report.
    pub fn render(self) -> Report {
        let text = self.render_text();
        tracing::debug!(
            target: "report",
            owners = self.owner_count(),
            paths = self.path_count(),
            "rendering report"
        );

        let owner_to_paths = self
            .index
            .into_iter()
            .map(|(owner, paths)| (owner.as_str().to_string(), paths.into_iter().collect()))
            .collect();

        Report::new(text, owner_to_paths)
    }

    /// Render the text body.
    ///
    /// One section per owner: a header line, one indented line per path and
    /// a blank separator. The whole body ends with one more blank line.
    fn render_text(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.path_count() + 2 * self.owner_count() + 1);

        for (owner, paths) in &self.index {
            lines.push(format!(" == USER: {owner} =="));
            for path in paths {
                lines.push(format!("  {path}"));
            }
            lines.push(String::new());
        }
        lines.push(String::new());

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_dedups_within_owner() {
        let mut aggregator = Aggregator::new();
        assert!(aggregator.record(Owner::from("alice"), "/a"));
        assert!(!aggregator.record(Owner::from("alice"), "/a"));
        assert!(aggregator.record(Owner::from("bob"), "/a"));

        assert_eq!(aggregator.owner_count(), 2);
        assert_eq!(aggregator.path_count(), 2);
        assert!(aggregator.contains(&Owner::from("bob"), "/a"));
        assert!(!aggregator.contains(&Owner::from("bob"), "/b"));
    }

    #[test]
    fn test_render_empty() {
        let report = Aggregator::new().render();
        assert_eq!(report.text, "");
        assert!(report.owner_to_paths.is_empty());
    }

    #[test]
    fn test_render_sorted_sections() {
        let mut aggregator = Aggregator::new();
        aggregator.record(Owner::from("zed"), "/z/2");
        aggregator.record(Owner::from("amy"), "/b");
        aggregator.record(Owner::from("zed"), "/z/1");
        aggregator.record(Owner::from("amy"), "/a");

        let report = aggregator.render();
        let expected = [
            " == USER: amy ==",
            "  /a",
            "  /b",
            "",
            " == USER: zed ==",
            "  /z/1",
            "  /z/2",
            "",
            "",
        ]
        .join("\n");
        assert_eq!(report.text, expected);
        assert_eq!(report.owner_to_paths["zed"], vec!["/z/1", "/z/2"]);
    }

    #[test]
    fn test_render_sentinel_owner() {
        let mut aggregator = Aggregator::new();
        aggregator.record(Owner::not_found(), "/c");
        aggregator.record(Owner::from("alice"), "/a");

        let report = aggregator.render();
        assert_eq!(
            report.text,
            " == USER: Not found ==\n  /c\n\n == USER: alice ==\n  /a\n\n"
        );
    }
}

//! Allow-list filtering of release candidates

use crate::types::ReleaseCandidate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Case-insensitive substring allow-list
///
/// An empty list passes every candidate. A non-empty list passes a candidate
/// when its label contains at least one entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct NameFilter {
    needles: Vec<String>,
}

impl From<Vec<String>> for NameFilter {
    fn from(entries: Vec<String>) -> Self {
        Self::new(entries)
    }
}

impl From<NameFilter> for Vec<String> {
    fn from(filter: NameFilter) -> Self {
        filter.needles
    }
}

impl NameFilter {
    /// Build a filter from individual entries; blanks are dropped
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let needles = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { needles }
    }

    /// Parse a comma-separated list such as `kali-purple, kali-installer`
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Whether the filter lets everything through
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.needles.is_empty()
    }

    /// Normalized entries
    pub fn entries(&self) -> &[String] {
        &self.needles
    }

    /// Check a display name against the allow-list
    #[must_use]
    pub fn allows(&self, label: &str) -> bool {
        if self.needles.is_empty() {
            return true;
        }
        let label = label.to_lowercase();
        self.needles.iter().any(|needle| label.contains(needle.as_str()))
    }

    /// Keep only the candidates whose label passes
    pub fn apply(&self, candidates: Vec<ReleaseCandidate>) -> Vec<ReleaseCandidate> {
        if self.is_empty() {
            return candidates;
        }
        candidates
            .into_iter()
            .filter(|c| {
                let keep = self.allows(c.label());
                if !keep {
                    debug!(name = %c.name, label = %c.label(), "candidate rejected by allow-list");
                }
                keep
            })
            .collect()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<ReleaseCandidate> {
        vec![
            ReleaseCandidate::new("kali-linux-2024.4-installer-amd64.iso", "https://x/1")
                .with_label("kali-installer-amd64"),
            ReleaseCandidate::new("kali-linux-2024.4-installer-purple-amd64.iso", "https://x/2")
                .with_label("Kali-Purple-amd64"),
            ReleaseCandidate::new("kali-linux-2024.4-raspberry-pi-armhf.img.xz", "https://x/3")
                .with_label("kali-raspberry-pi-armhf"),
        ]
    }

    #[test]
    fn empty_allow_list_passes_everything() {
        let filter = NameFilter::parse("");
        assert!(filter.is_empty());
        assert_eq!(filter.apply(candidates()).len(), 3);
        assert!(filter.allows("anything at all"));
    }

    #[test]
    fn allow_list_matches_case_insensitive_substrings() {
        let filter = NameFilter::new(["kali-purple"]);
        let kept = filter.apply(candidates());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "kali-linux-2024.4-installer-purple-amd64.iso");
    }

    #[test]
    fn comma_separated_list_is_trimmed_and_lowercased() {
        let filter = NameFilter::parse(" Kali-Purple , ,RASPBERRY ");
        assert_eq!(filter.entries(), ["kali-purple", "raspberry"]);
        let kept: Vec<_> = filter
            .apply(candidates())
            .into_iter()
            .map(|c| c.label().to_string())
            .collect();
        assert_eq!(kept, ["Kali-Purple-amd64", "kali-raspberry-pi-armhf"]);
    }

    #[test]
    fn filter_uses_label_not_file_name() {
        // "installer" appears in the purple ISO's file name but not in its label
        let filter = NameFilter::parse("installer");
        let kept = filter.apply(candidates());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].label(), "kali-installer-amd64");
    }

    #[test]
    fn deserializes_from_json_array() {
        let filter: NameFilter = serde_json::from_str(r#"["Kali-Purple", " "]"#).unwrap();
        assert_eq!(filter.entries(), ["kali-purple"]);
        assert!(filter.allows("KALI-PURPLE-amd64"));
    }
}

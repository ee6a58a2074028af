//! Dotted numeric version comparison
//!
//! Release numbers such as `24.04`, `2024.4` or `12.5.0` are compared
//! component-wise as integers, so `1.10` ranks above `1.9`. A version that is a
//! strict prefix of another ranks below it (`1.2 < 1.2.0`), matching tuple
//! ordering.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// First dotted numeric token inside a larger string
#[allow(clippy::expect_used)]
static VERSION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)+").expect("version token regex is valid"));

/// A parsed dotted numeric version
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DottedVersion(Vec<u64>);

impl DottedVersion {
    /// Parse a version like `24.04` or `2.0`
    ///
    /// Returns `None` for empty strings, empty components (`1..2`) and
    /// anything that is not an unsigned integer.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        s.split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    None
                } else {
                    part.parse::<u64>().ok()
                }
            })
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }
}

impl FromStr for DottedVersion {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::error::Error::Other(format!("not a dotted version: '{s}'")))
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
            first = false;
        }
        Ok(())
    }
}

/// Compare two version strings, treating unparseable input as lowest
pub fn compare(a: &str, b: &str) -> Ordering {
    DottedVersion::parse(a).cmp(&DottedVersion::parse(b))
}

/// The item with the highest version according to `version_of`
///
/// Items for which `version_of` yields `None` are skipped. Among equal
/// versions the last one wins.
pub fn max_by_version<T, I, F>(items: I, version_of: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> Option<DottedVersion>,
{
    items
        .into_iter()
        .filter_map(|item| version_of(&item).map(|v| (v, item)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, item)| item)
}

/// Pick the highest version string, ignoring entries that do not parse
pub fn latest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    max_by_version(versions, |v| DottedVersion::parse(v))
}

/// Find the first dotted version token embedded in a name
///
/// Returns the byte range of the token alongside the parsed version, e.g.
/// `kali-linux-2.0-installer-amd64` yields `2.0` at `11..14`.
pub fn find_embedded(name: &str) -> Option<(std::ops::Range<usize>, DottedVersion)> {
    let m = VERSION_TOKEN.find(name)?;
    DottedVersion::parse(m.as_str()).map(|v| (m.range(), v))
}

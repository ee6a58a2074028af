//! Detection of superseded releases in the torrent client
//!
//! Two torrents belong to the same release line when their names are equal
//! apart from the first dotted version token, e.g.
//! `kali-linux-2024.3-installer-amd64.iso` and
//! `kali-linux-2024.4-installer-amd64.iso`. Within a line only the highest
//! version is kept.

use crate::transmission::TorrentInfo;
use crate::version::{self, DottedVersion};
use std::collections::HashMap;

/// Torrents that an older version of the same release line
///
/// Names without a version token are never returned. The result keeps the
/// input order.
pub fn plan_removals(torrents: &[TorrentInfo]) -> Vec<TorrentInfo> {
    let mut lines: HashMap<(&str, &str), Vec<(DottedVersion, usize)>> = HashMap::new();
    for (idx, torrent) in torrents.iter().enumerate() {
        if let Some((range, version)) = version::find_embedded(&torrent.name) {
            let key = (&torrent.name[..range.start], &torrent.name[range.end..]);
            lines.entry(key).or_default().push((version, idx));
        }
    }

    let mut doomed: Vec<usize> = Vec::new();
    for members in lines.into_values() {
        let Some(newest) = members.iter().map(|(v, _)| v).max().cloned() else {
            continue;
        };
        doomed.extend(
            members
                .into_iter()
                .filter(|(v, _)| *v < newest)
                .map(|(_, idx)| idx),
        );
    }
    doomed.sort_unstable();
    doomed.into_iter().map(|idx| torrents[idx].clone()).collect()
}

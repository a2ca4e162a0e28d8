//! Hierarchical postal-code prefix index for static autocomplete.
//!
//! `root.json` maps each 1-character prefix to its top completions; deeper
//! files live under a directory named after the first character, e.g.
//! `9/94.json` maps the 3-character prefixes starting with `94`.

use crate::core::grid::Grid;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Prefixes at or beyond this length are written in full and not split further.
const MAX_PREFIX_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ZipIndexEntry {
    pub code: String,
    pub city: String,
    pub pop: u64,
    pub i: usize,
    pub j: usize,
}

// 以陣列輸出 [code, city, i, j] 以縮小檔案
impl Serialize for ZipIndexEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&self.code)?;
        tuple.serialize_element(&self.city)?;
        tuple.serialize_element(&self.i)?;
        tuple.serialize_element(&self.j)?;
        tuple.end()
    }
}

/// Completions for one prefix plus the cells to highlight, encoded as
/// `(i << 8) | j`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZipPrefix {
    #[serde(rename = "Z")]
    pub entries: Vec<ZipIndexEntry>,
    #[serde(rename = "C")]
    pub cells: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZipIndexFile {
    /// Path relative to the index directory.
    pub path: String,
    pub prefixes: BTreeMap<String, ZipPrefix>,
}

/// Every zip bucketed in an active region, most populous first. Codes that
/// are not plain ASCII alphanumerics are left out, since they become file
/// names.
pub fn collect_entries(grid: &Grid<'_>) -> Vec<ZipIndexEntry> {
    let mut skipped = 0;
    let mut entries: Vec<ZipIndexEntry> = grid
        .regions()
        .flat_map(|region| region.zips.iter().map(move |zip| (region, zip)))
        .filter(|(_, zip)| {
            let usable = is_index_safe(&zip.code);
            if !usable {
                skipped += 1;
            }
            usable
        })
        .map(|(region, zip)| ZipIndexEntry {
            code: zip.code.clone(),
            city: zip.city.clone(),
            pop: zip.pop,
            i: region.i,
            j: region.j,
        })
        .collect();
    if skipped > 0 {
        tracing::debug!("Skipped {} zips with unusable codes", skipped);
    }
    entries.sort_by(|a, b| b.pop.cmp(&a.pop));
    entries
}

fn is_index_safe(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Builds every index file, each group truncated to `completions` entries
/// above the last level.
pub fn build_zip_index(entries: &[ZipIndexEntry], completions: usize) -> Vec<ZipIndexFile> {
    let mut files = Vec::new();
    write_level("", entries, completions, &mut files);
    files
}

fn write_level(
    prefix: &str,
    entries: &[ZipIndexEntry],
    completions: usize,
    files: &mut Vec<ZipIndexFile>,
) {
    let len = prefix.chars().count() + 1;
    let groups = group_by_prefix(entries, len);
    let split = len < MAX_PREFIX_LEN;

    if split {
        for (child, group) in &groups {
            write_level(child, group, completions, files);
        }
    }

    let prefixes = groups
        .into_iter()
        .map(|(key, group)| {
            let cells: BTreeSet<i32> = group
                .iter()
                .map(|e| ((e.i as i32) << 8) | e.j as i32)
                .collect();
            let mut entries = group;
            if split {
                entries.truncate(completions);
            }
            (
                key,
                ZipPrefix {
                    entries,
                    cells: cells.into_iter().collect(),
                },
            )
        })
        .collect();

    let path = match prefix.chars().next() {
        None => "root.json".to_string(),
        Some(first) => format!("{}/{}.json", first, prefix),
    };
    files.push(ZipIndexFile { path, prefixes });
}

fn group_by_prefix(entries: &[ZipIndexEntry], len: usize) -> BTreeMap<String, Vec<ZipIndexEntry>> {
    let mut groups: BTreeMap<String, Vec<ZipIndexEntry>> = BTreeMap::new();
    for entry in entries {
        let key: String = entry.code.chars().take(len).collect();
        if key.chars().count() < len {
            continue;
        }
        groups.entry(key).or_default().push(entry.clone());
    }
    groups
}

//! Parsing archive listings into the extracted members they imply.

use regex::Regex;
use std::path::{Component, Path};
use std::sync::LazyLock;

/// A table row of `7z l`: timestamp (possibly blank), attributes, then sizes.
static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}| {19}) ([D.][R.][H.][S.][A.]) ").unwrap());
/// The dashed rule above and below the table; its last run marks the name column.
static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-{19} -{5} -+ -+ +(-+)\s*$").unwrap());

/// Token some listing formats emit in their summary row ("1 files").
const HEADER_ARTIFACT: &str = "files";

/// What a staged directory's archive says about its extracted contents.
///
/// Replaces "string, list, mapping or nothing" with one explicit tag that
/// every consumer matches on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Members {
    /// The directory holds no archive.
    NoArchive,
    /// Exactly one archive member sits extracted next to the archive.
    Single(String),
    /// More than one archive member sits extracted next to the archive; which
    /// one to scrub is ambiguous.
    Multi(Vec<String>),
    /// The archive lists members but none of them is present on disk, so
    /// there is no extracted copy to identify.
    Missing(Vec<String>),
}

/// Extracts file member names from `7z l` output.
///
/// Names are trimmed, empty names and the summary artifact `files` are
/// dropped, directory members are skipped, and duplicates (multi-volume
/// listings repeat entries) are removed keeping first occurrence.
pub fn parse_listing(listing: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut name_column = None;
    let mut in_table = false;
    for line in listing.lines() {
        if let Some(captures) = RULE.captures(line) {
            // A second rule closes the table; a later listing (another
            // volume) opens a new one.
            in_table = !in_table;
            name_column = captures.get(1).map(|m| m.start());
            continue;
        }
        if !in_table {
            continue;
        }
        let (Some(column), Some(row)) = (name_column, ROW.captures(line)) else {
            continue;
        };
        if row.get(1).is_some_and(|attr| attr.as_str().starts_with('D')) {
            continue;
        }
        let Some(name) = line.get(column..).map(str::trim) else {
            continue;
        };
        if name.is_empty() || name == HEADER_ARTIFACT || names.iter().any(|n| n == name) {
            continue;
        }
        names.push(name.to_string());
    }
    names
}

/// A member name is only usable if it stays inside the staged directory.
fn is_contained(name: &str) -> bool {
    Path::new(name).components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Returns `true` when `name` carries the archive extension (case-insensitive).
pub fn has_extension(name: impl AsRef<Path>, extension: &str) -> bool {
    name.as_ref().extension().is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Narrows listed members down to the ones already extracted beside the
/// archive in `dir`, and tags the result.
pub fn classify_members(dir: &Path, listed: Vec<String>, extension: &str) -> Members {
    let listed: Vec<String> =
        listed.into_iter().filter(|name| is_contained(name) && !has_extension(name, extension)).collect();
    let mut extracted: Vec<String> = listed.iter().filter(|name| dir.join(name).is_file()).cloned().collect();
    match extracted.len() {
        0 => Members::Missing(listed),
        1 => Members::Single(extracted.remove(0)),
        _ => Members::Multi(extracted),
    }
}

//! Glob expansion of task sources into a concrete file list.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Compiles patterns into a set where `*` stays within one path segment.
pub fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(normalize_pattern(pattern))
            .literal_separator(true)
            .build()
            .map_err(|source| Error::Glob {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| Error::Glob {
        pattern: patterns.join(", "),
        source,
    })
}

/// Expands `sources` under `root`, minus anything matched by `exclude`.
///
/// Returned paths are relative to `root`, `/`-separated, unique and sorted.
/// Any path with a segment starting with `.` is never returned.
pub fn resolve_files(root: &Path, sources: &[String], exclude: &[String]) -> Result<Vec<String>> {
    let source_set = build_glob_set(sources)?;
    let exclude_set = build_glob_set(exclude)?;

    let mut bases: BTreeSet<PathBuf> = sources.iter().map(|p| literal_base(p)).collect();
    // A base nested inside another base is already covered by the outer walk.
    let snapshot: Vec<PathBuf> = bases.iter().cloned().collect();
    bases.retain(|base| {
        !snapshot
            .iter()
            .any(|other| other != base && base.starts_with(other))
    });

    let mut matched = BTreeSet::new();
    for base in bases {
        let walk_root = root.join(&base);
        if !walk_root.exists() {
            trace!(base = %walk_root.display(), "glob base does not exist");
            continue;
        }

        let walker = WalkDir::new(&walk_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(Error::Walk {
                        root: walk_root.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "skipping unreadable path during resolution");
                    continue;
                }
            };

            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            let Some(rel) = relative_path(root, entry.path()) else {
                continue;
            };
            if rel.split('/').any(|segment| segment.starts_with('.')) {
                continue;
            }
            if source_set.is_match(&rel) && !exclude_set.is_match(&rel) {
                matched.insert(rel);
            }
        }
    }

    debug!(
        sources = ?sources,
        exclude = ?exclude,
        count = matched.len(),
        "resolved source files"
    );
    Ok(matched.into_iter().collect())
}

fn normalize_pattern(pattern: &str) -> &str {
    let mut p = pattern.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p
}

/// Leading directory of a pattern that contains no glob syntax.
fn literal_base(pattern: &str) -> PathBuf {
    let pattern = normalize_pattern(pattern);
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal_len = segments
        .iter()
        .position(|segment| segment.contains(GLOB_META))
        .unwrap_or(segments.len().saturating_sub(1));
    segments[..literal_len]
        .iter()
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use regex::RegexSet;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::DiffError;
use crate::models::{EntryKind, FilePair, MatchResult};

/// Include/exclude rules applied to paths relative to each root.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: RegexSet,
    exclude: RegexSet,
    ignore: Option<GlobSet>,
}

impl Default for PathFilter {
    fn default() -> Self {
        PathFilter {
            include: RegexSet::empty(),
            exclude: RegexSet::empty(),
            ignore: None,
        }
    }
}

impl PathFilter {
    pub fn new(
        include: &[String],
        exclude: &[String],
        ignore_globs: &[String],
    ) -> Result<Self, DiffError> {
        let include = RegexSet::new(include)
            .map_err(|source| DiffError::InvalidPattern { kind: "include", source })?;
        let exclude = RegexSet::new(exclude)
            .map_err(|source| DiffError::InvalidPattern { kind: "exclude", source })?;

        let ignore = if ignore_globs.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for p in ignore_globs {
                builder.add(Glob::new(p)?);
            }
            Some(builder.build()?)
        };

        Ok(PathFilter {
            include,
            exclude,
            ignore,
        })
    }

    /// Excludes always win over includes.
    pub fn accepts(&self, rel_path: &Path) -> bool {
        let text = rel_path.to_string_lossy();
        if !self.include.is_empty() && !self.include.is_match(&text) {
            return false;
        }
        if self.exclude.is_match(&text) {
            return false;
        }
        match self.ignore {
            Some(ref set) => !set.is_match(rel_path),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalkError {
    pub path: PathBuf,
    pub error: String,
}

/// Output of walking both roots.
#[derive(Debug, Default)]
pub struct TreeMatch {
    pub pairs: Vec<FilePair>,
    pub notices: Vec<MatchResult>,
    pub walk_errors: Vec<WalkError>,
}

impl TreeMatch {
    fn push(&mut self, result: MatchResult) {
        match result {
            MatchResult::Paired(pair) => self.pairs.push(pair),
            notice => self.notices.push(notice),
        }
    }
}

/// Walks `root_a` then `root_b` and pairs entries by relative path.
///
/// Both walks are depth-first with entries sorted by name, so the result is
/// stable for an unchanged filesystem.
pub fn match_trees(root_a: &Path, root_b: &Path, filter: &PathFilter) -> TreeMatch {
    let mut out = TreeMatch::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    debug!("finding files in {}", root_a.display());
    for rel in relative_entries(root_a, &mut out.walk_errors) {
        if !filter.accepts(&rel) {
            continue;
        }
        let path_a = root_a.join(&rel);
        let path_b = root_b.join(&rel);

        if fs::symlink_metadata(&path_b).is_err() {
            out.push(MatchResult::OnlyInA {
                dir: containing_dir(root_a, &rel),
                name: base_name(&rel),
            });
            continue;
        }

        if let Some(result) = match_present(&rel, &path_a, &path_b, root_a, root_b) {
            out.push(result);
        }
        seen.insert(rel);
    }

    debug!("finding files in {}", root_b.display());
    for rel in relative_entries(root_b, &mut out.walk_errors) {
        if !filter.accepts(&rel) || seen.contains(&rel) {
            continue;
        }
        out.push(MatchResult::OnlyInB {
            dir: containing_dir(root_b, &rel),
            name: base_name(&rel),
        });
    }

    out
}

/// Decides what to report for a path that exists under both roots.
fn match_present(
    rel: &Path,
    path_a: &Path,
    path_b: &Path,
    root_a: &Path,
    root_b: &Path,
) -> Option<MatchResult> {
    let kind_a = EntryKind::of(path_a)?;
    let kind_b = EntryKind::of(path_b)?;

    match (kind_a, kind_b) {
        (EntryKind::File, EntryKind::File) => {
            Some(MatchResult::Paired(FilePair::new(rel, root_a, root_b)))
        }
        (EntryKind::File, _) | (_, EntryKind::File) => Some(MatchResult::TypeMismatch {
            path_a: path_a.to_path_buf(),
            kind_a,
            path_b: path_b.to_path_buf(),
            kind_b,
        }),
        _ => None,
    }
}

fn relative_entries(root: &Path, errors: &mut Vec<WalkError>) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut entries = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                debug!("{}", err);
                errors.push(WalkError {
                    path: error_path(&err).unwrap_or_else(|| root.to_path_buf()),
                    error: err.to_string(),
                });
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        match entry.path().strip_prefix(root) {
            Ok(rel) => entries.push(rel.to_path_buf()),
            Err(_) => warn!("walked outside of {}: {}", root.display(), entry.path().display()),
        }
    }
    entries
}

fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

fn containing_dir(root: &Path, rel: &Path) -> PathBuf {
    match rel.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => root.join(parent),
        _ => root.to_path_buf(),
    }
}

fn base_name(rel: &Path) -> String {
    rel.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressGlyphs {
    #[default]
    Ascii,
    Unicode,
}

/// Two files, one under each root, matched by relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePair {
    pub rel_path: PathBuf,
    pub path_a: PathBuf,
    pub path_b: PathBuf,
}

impl FilePair {
    pub fn new(rel_path: &Path, root_a: &Path, root_b: &Path) -> Self {
        FilePair {
            rel_path: rel_path.to_path_buf(),
            path_a: root_a.join(rel_path),
            path_b: root_b.join(rel_path),
        }
    }

    /// Header line that precedes the comparator output for this pair.
    pub fn header(&self) -> String {
        format!(
            "diff -r {} {}\n",
            self.path_a.display(),
            self.path_b.display()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Special,
}

impl EntryKind {
    pub fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::symlink_metadata(path).ok()?;
        let ft = meta.file_type();
        if ft.is_symlink() {
            // Symlinks to regular files compare like the file they point at.
            if path.is_file() {
                return Some(EntryKind::File);
            }
            return Some(EntryKind::Symlink);
        }
        Some(if ft.is_file() {
            EntryKind::File
        } else if ft.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Special
        })
    }

    fn describe(self) -> &'static str {
        match self {
            EntryKind::File => "a regular file",
            EntryKind::Directory => "a directory",
            EntryKind::Symlink => "a symbolic link",
            EntryKind::Special => "a special file",
        }
    }
}

/// What the tree walk decided about one accepted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    Paired(FilePair),
    OnlyInA { dir: PathBuf, name: String },
    OnlyInB { dir: PathBuf, name: String },
    TypeMismatch {
        path_a: PathBuf,
        kind_a: EntryKind,
        path_b: PathBuf,
        kind_b: EntryKind,
    },
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Paired(pair) => write!(
                f,
                "{} <-> {}",
                pair.path_a.display(),
                pair.path_b.display()
            ),
            MatchResult::OnlyInA { dir, name } | MatchResult::OnlyInB { dir, name } => {
                write!(f, "Only in {}: {}", dir.display(), name)
            }
            MatchResult::TypeMismatch {
                path_a,
                kind_a,
                path_b,
                kind_b,
            } => write!(
                f,
                "File {} is {} while file {} is {}",
                path_a.display(),
                kind_a.describe(),
                path_b.display(),
                kind_b.describe()
            ),
        }
    }
}

/// Classified result of running the comparator on one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Exit status 0. Any output the comparator still printed is kept.
    Identical(Option<String>),
    /// Exit status 1. Header-annotated comparator output.
    Different(String),
    /// Exit status > 1 or launch failure. The text is an operator diagnostic.
    ToolError(String),
}

impl Outcome {
    pub fn status(&self) -> AggregateStatus {
        match self {
            Outcome::Identical(_) => AggregateStatus::NoDifferences,
            Outcome::Different(_) => AggregateStatus::DifferencesFound,
            Outcome::ToolError(_) => AggregateStatus::ToolFailure,
        }
    }

    /// Text this outcome contributes to the report.
    pub fn report_text(&self) -> Option<&str> {
        match self {
            Outcome::Identical(text) => text.as_deref(),
            Outcome::Different(text) => Some(text),
            Outcome::ToolError(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Identical(_) => "identical",
            Outcome::Different(_) => "different",
            Outcome::ToolError(_) => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PairReport {
    pub pair: FilePair,
    pub outcome: Outcome,
}

/// Everything one worker hands back for its chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkResult {
    pub reports: Vec<PairReport>,
    pub interrupted: bool,
}

/// Run-level outcome. Discriminants double as process exit codes and as the
/// dominance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AggregateStatus {
    #[default]
    NoDifferences = 0,
    DifferencesFound = 1,
    ToolFailure = 2,
    Interrupted = 3,
}

impl AggregateStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => AggregateStatus::NoDifferences,
            1 => AggregateStatus::DifferencesFound,
            2 => AggregateStatus::ToolFailure,
            _ => AggregateStatus::Interrupted,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Dominance rule: the more severe status always wins.
    pub fn combine(self, other: AggregateStatus) -> AggregateStatus {
        self.max(other)
    }
}

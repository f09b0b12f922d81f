//! Deterministic source discovery.
//!
//! Roots are walked in the order given; within a directory entries are
//! visited in lexicographic file-name order. Files under excluded paths are
//! still listed (as skipped) so the report can account for them.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeSet;
use syntaxfix_types::report::SkippedPath;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

pub const DEFAULT_EXCLUDED_SEGMENTS: &[&str] = &["node_modules", ".git", ".next", "dist", "build"];

pub const DEFAULT_EXTENSIONS: &[&str] = &["ts", "tsx"];

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("root {0} does not exist")]
    MissingRoot(Utf8PathBuf),

    #[error("invalid exclude pattern `{pattern}`: {source}")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Which paths are never repaired. Paths are matched root-relative, with `/` separators.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    segments: Vec<String>,
    prefixes: Vec<String>,
    suffixes: Vec<String>,
    globs: Vec<glob::Pattern>,
}

impl ExclusionPolicy {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Dependency, VCS and build-output directories.
    pub fn standard() -> Self {
        DEFAULT_EXCLUDED_SEGMENTS
            .iter()
            .fold(Self::empty(), |p, seg| p.with_segment(*seg))
    }

    /// Exclude any path with a directory component equal to `segment`.
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.push(suffix.into());
        self
    }

    pub fn with_glob(mut self, pattern: &str) -> Result<Self, WalkError> {
        let glob = glob::Pattern::new(pattern).map_err(|source| WalkError::InvalidExclude {
            pattern: pattern.to_string(),
            source,
        })?;
        self.globs.push(glob);
        Ok(self)
    }

    /// Interpret a user-supplied exclude entry.
    ///
    /// `*`, `?` or `[` make it a glob, a `/` makes it a path prefix, a
    /// leading `.` with no `/` (like `.d.ts`) a file suffix, anything else a
    /// directory name.
    pub fn with_pattern(self, raw: &str) -> Result<Self, WalkError> {
        let raw = raw.trim();
        if raw.contains(['*', '?', '[']) {
            self.with_glob(raw)
        } else if raw.contains('/') {
            Ok(self.with_prefix(raw.trim_start_matches("./")))
        } else if raw.starts_with('.') && raw[1..].contains('.') {
            Ok(self.with_suffix(raw))
        } else {
            Ok(self.with_segment(raw))
        }
    }

    /// Why `rel` is excluded, if it is.
    pub fn excludes(&self, rel: &str) -> Option<String> {
        let mut parts: Vec<&str> = rel.split('/').collect();
        parts.pop();
        if let Some(seg) = parts
            .iter()
            .find(|p| self.segments.iter().any(|s| s == *p))
        {
            return Some(format!("excluded segment `{seg}`"));
        }
        if let Some(prefix) = self
            .prefixes
            .iter()
            .find(|p| Utf8Path::new(rel).starts_with(p.as_str()))
        {
            return Some(format!("excluded prefix `{prefix}`"));
        }
        if let Some(suffix) = self.suffixes.iter().find(|s| rel.ends_with(s.as_str())) {
            return Some(format!("excluded suffix `{suffix}`"));
        }
        self.globs
            .iter()
            .find(|g| g.matches(rel))
            .map(|g| format!("excluded pattern `{}`", g.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path usable for I/O.
    pub path: Utf8PathBuf,
    /// Normalised path used in reports and override globs.
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEntry {
    Source(SourceFile),
    Skipped(SkippedPath),
}

#[derive(Debug, Clone)]
pub struct FileWalker {
    roots: Vec<Utf8PathBuf>,
    extensions: Vec<String>,
    exclusions: ExclusionPolicy,
}

impl FileWalker {
    pub fn new(
        roots: Vec<Utf8PathBuf>,
        extensions: Vec<String>,
        exclusions: ExclusionPolicy,
    ) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self {
            roots,
            extensions,
            exclusions,
        }
    }

    pub fn walk(&self) -> Result<Vec<WalkEntry>, WalkError> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();

        for root in &self.roots {
            if !root.exists() {
                return Err(WalkError::MissingRoot(root.clone()));
            }

            if root.is_file() {
                let display = display_path(root);
                if !seen.insert(display.clone()) {
                    continue;
                }
                if self.selects(root) {
                    // Explicit files are matched on the whole path as given.
                    let rel = display.clone();
                    out.push(self.classify(root.clone(), display, &rel));
                } else {
                    out.push(WalkEntry::Skipped(SkippedPath {
                        path: display,
                        reason: "extension not selected".to_string(),
                    }));
                }
                continue;
            }

            for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        let path = err
                            .path()
                            .map(|p| p.to_string_lossy().replace('\\', "/"))
                            .unwrap_or_else(|| root.to_string());
                        debug!(path = %path, error = %err, "walk error");
                        out.push(WalkEntry::Skipped(SkippedPath {
                            path,
                            reason: format!("unreadable: {err}"),
                        }));
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(path) = Utf8Path::from_path(entry.path()) else {
                    out.push(WalkEntry::Skipped(SkippedPath {
                        path: entry.path().to_string_lossy().to_string(),
                        reason: "path is not valid UTF-8".to_string(),
                    }));
                    continue;
                };
                if !self.selects(path) {
                    continue;
                }

                let display = display_path(path);
                if !seen.insert(display.clone()) {
                    continue;
                }
                let rel = path
                    .strip_prefix(root)
                    .map(|p| p.as_str().replace('\\', "/"))
                    .unwrap_or_else(|_| display.clone());
                out.push(self.classify(path.to_path_buf(), display, &rel));
            }
        }

        Ok(out)
    }

    fn selects(&self, path: &Utf8Path) -> bool {
        path.extension()
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    fn classify(&self, path: Utf8PathBuf, shown: String, rel: &str) -> WalkEntry {
        match self.exclusions.excludes(rel) {
            Some(reason) => {
                debug!(path = %shown, reason = %reason, "skipping");
                WalkEntry::Skipped(SkippedPath {
                    path: shown,
                    reason,
                })
            }
            None => WalkEntry::Source(SourceFile {
                path,
                display: shown,
            }),
        }
    }
}

/// Source files only, in walk order.
pub fn included(entries: &[WalkEntry]) -> impl Iterator<Item = &SourceFile> {
    entries.iter().filter_map(|e| match e {
        WalkEntry::Source(src) => Some(src),
        WalkEntry::Skipped(_) => None,
    })
}

fn display_path(path: &Utf8Path) -> String {
    let s = path.as_str().replace('\\', "/");
    match s.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => s,
    }
}

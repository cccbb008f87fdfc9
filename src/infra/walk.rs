//! Filepath: src/infra/walk.rs
//! Lazy depth-first file walker for the conversion pipeline.
//! - Yields every regular file under the root by default (no ignore files)
//! - Subdirectories are descended as soon as they are encountered
//! - Optional suffix filter (`.ext`); directories are always descended
//! - Optional extra ignore globs and opt-in `.gitignore` respect
//! - Symbolic links and unreadable directories abort the walk
//! - Siblings are visited in file-name order for stable tests/CI
//!
//! Backed by ripgrep's `ignore` crate and `globset`.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

/// Fatal traversal failures.
#[derive(Debug, thiserror::Error)]
pub enum WalkError
{
    #[error("cannot access {}", path.display())]
    Io
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("symbolic links are not supported: {}", .0.display())]
    Symlink(PathBuf),

    #[error("invalid ignore glob")]
    Glob(#[from] globset::Error),

    #[error(transparent)]
    Walk(#[from] ignore::Error),
}

/// Walker configuration; `walk` hands out a fresh, single-use sequence.
/// Extra globs are applied in two places:
///   1) Early: prune directories during traversal (filter_entry).
///   2) Late: filter out files that still slipped through.
#[derive(Debug, Clone)]
pub struct FileWalker
{
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Required file-name suffix, stored with its leading dot
    suffix: Option<String>,

    /// Respect .gitignore / .git/info/exclude; default false
    respect_gitignore: bool,

    /// Directories never descended into (e.g. the staging root)
    skip_dirs: Vec<PathBuf>,
}

impl FileWalker
{
    /// Build a walker with additional ignore patterns (e.g., "target/**").
    /// Patterns match on paths relative to the walk root.
    pub fn new(additional_ignores: &[String]) -> Result<Self, WalkError>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore_patterns: builder.build()?,
            suffix: None,
            respect_gitignore: false,
            skip_dirs: Vec::new(),
        })
    }

    /// (Optional) Only yield files whose name ends with `.ext`.
    /// Accepts `rs` as well as `.rs`.
    pub fn with_extension(
        mut self,
        ext: Option<&str>,
    ) -> Self
    {
        self.suffix = ext
            .map(|e| e.trim_start_matches('.'))
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{e}"));
        self
    }

    /// (Optional) Honor .gitignore and .git/info/exclude rules.
    pub fn with_gitignore(
        mut self,
        respect: bool,
    ) -> Self
    {
        self.respect_gitignore = respect;
        self
    }

    /// (Optional) Never descend into `dir`.
    pub fn with_skip_dir(
        mut self,
        dir: impl Into<PathBuf>,
    ) -> Self
    {
        self.skip_dirs
            .push(dir.into());
        self
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // Plain traversal: hidden files included, no ignore files
        b.standard_filters(false);

        if self.respect_gitignore
        {
            b.git_ignore(true);
            b.git_exclude(true);
            b.require_git(false);
        }

        // Links are reported, never followed
        b.follow_links(false);
        b.sort_by_file_name(|a, b| a.cmp(b));

        let extra = self
            .ignore_patterns
            .clone();
        let skip = self
            .skip_dirs
            .clone();
        let base = root.to_path_buf();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .is_some_and(|ft| ft.is_dir());

            if !is_dir || ent.depth() == 0
            {
                return true;
            }

            if skip
                .iter()
                .any(|s| s == ent.path())
            {
                return false;
            }

            let rel = ent
                .path()
                .strip_prefix(&base)
                .unwrap_or(ent.path());
            !extra.is_match(rel)
        });

        b
    }

    /// Start a fresh depth-first walk of `root`.
    pub fn walk<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Walk
    {
        let root = root
            .as_ref()
            .to_path_buf();

        Walk {
            inner: self
                .build_walk(&root)
                .build(),
            ignore_patterns: self
                .ignore_patterns
                .clone(),
            suffix: self
                .suffix
                .clone(),
            root,
            done: false,
        }
    }

    /// Walk `root` to completion; the first failure aborts the whole walk.
    pub fn walk_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Result<Vec<PathBuf>, WalkError>
    {
        self.walk(root)
            .collect()
    }
}

/// Single-use sequence of file paths. After an error it yields nothing more.
pub struct Walk
{
    inner: ignore::Walk,
    ignore_patterns: GlobSet,
    suffix: Option<String>,
    root: PathBuf,
    done: bool,
}

impl Walk
{
    fn accepts(
        &self,
        path: &Path,
    ) -> bool
    {
        let rel = path
            .strip_prefix(&self.root)
            .unwrap_or(path);
        if self
            .ignore_patterns
            .is_match(rel)
        {
            return false;
        }

        match &self.suffix
        {
            Some(suffix) => path
                .file_name()
                .is_some_and(|n| {
                    n.to_string_lossy()
                        .ends_with(suffix.as_str())
                }),
            None => true,
        }
    }
}

impl Iterator for Walk
{
    type Item = Result<PathBuf, WalkError>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.done
        {
            return None;
        }

        loop
        {
            let entry = match self
                .inner
                .next()?
            {
                Ok(entry) => entry,
                Err(err) =>
                {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            };

            if entry.depth() > 0 && entry.path_is_symlink()
            {
                self.done = true;
                return Some(Err(WalkError::Symlink(entry.into_path())));
            }

            let is_file = entry
                .file_type()
                .is_some_and(|ft| ft.is_file());
            if !is_file || !self.accepts(entry.path())
            {
                continue;
            }

            return Some(Ok(entry.into_path()));
        }
    }
}

impl std::iter::FusedIterator for Walk {}

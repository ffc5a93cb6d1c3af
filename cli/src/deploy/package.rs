//! Artifact packaging
//!
//! Walks the project directory, applies the ignore rules and produces a
//! single `project.zip` at the project root. Packaging fully completes
//! before any network call is made; any I/O error here is fatal to the
//! deploy attempt.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::CliError;

/// Name of the produced archive, always excluded from itself.
pub const ARCHIVE_NAME: &str = "project.zip";

/// Optional per-project ignore file at the project root.
pub const IGNORE_FILE: &str = ".dockignore";

/// Always-excluded paths: build metadata, version control, the link state
/// directory and any previous archive.
const BUILTIN_PATTERNS: &[&str] = &[
    "node_modules/**",
    "vendor/**",
    ".git/**",
    ".dock/**",
    ARCHIVE_NAME,
];

/// Ordered set of glob patterns excluding paths from packaging.
///
/// `**` spans any number of path segments; `*` does not cross separators.
/// A match by any rule excludes, built-ins included.
#[derive(Debug, Clone)]
pub struct IgnoreRuleSet {
    set: GlobSet,
    patterns: Vec<String>,
}

impl IgnoreRuleSet {
    /// Built-in rules only.
    pub fn builtin() -> Result<Self, CliError> {
        Self::with_user_patterns(std::iter::empty::<&str>())
    }

    /// Built-in rules plus user patterns, in file order. Blank lines and
    /// `#` comments are skipped. A pattern ending in `/` also excludes
    /// everything under that directory.
    pub fn with_user_patterns<I, S>(user_patterns: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<String> =
            BUILTIN_PATTERNS.iter().map(|p| p.to_string()).collect();

        for line in user_patterns {
            let pattern = line.as_ref().trim();
            if pattern.is_empty() || pattern.starts_with('#') {
                continue;
            }
            patterns.push(pattern.to_string());
            if pattern.ends_with('/') {
                patterns.push(format!("{}**", pattern));
            }
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()?;
            builder.add(glob);
        }

        Ok(Self {
            set: builder.build()?,
            patterns,
        })
    }

    /// Whether a path (relative to the project root) is excluded.
    pub fn is_match(&self, rel_path: &Path) -> bool {
        self.set.is_match(rel_path)
    }

    /// Effective patterns in order, built-ins first.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Load the effective rule set for a project root, reading `.dockignore`
/// when present.
pub async fn load_ignore_rules(root: &Path) -> Result<IgnoreRuleSet, CliError> {
    let ignore_path = root.join(IGNORE_FILE);
    match tokio::fs::read_to_string(&ignore_path).await {
        Ok(contents) => {
            debug!("Using {}", IGNORE_FILE);
            IgnoreRuleSet::with_user_patterns(contents.lines())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => IgnoreRuleSet::builtin(),
        Err(e) => Err(e.into()),
    }
}

/// The packaged project archive on local disk.
#[derive(Debug)]
pub struct Archive {
    pub path: PathBuf,
    pub size: u64,
}

/// Package the project directory into `project.zip`.
///
/// Hidden files are included unless a rule excludes them. Compression is
/// Deflate at maximum level. Runs on a blocking task since zip writing is
/// synchronous I/O.
pub async fn build_archive(root: PathBuf, rules: IgnoreRuleSet) -> Result<Archive, CliError> {
    tokio::task::spawn_blocking(move || build_archive_blocking(&root, &rules))
        .await
        .map_err(|e| CliError::Internal(format!("packaging task panicked: {e}")))?
}

fn build_archive_blocking(root: &Path, rules: &IgnoreRuleSet) -> Result<Archive, CliError> {
    let archive_path = root.join(ARCHIVE_NAME);
    let file = std::fs::File::create(&archive_path)?;
    let mut zip = ZipWriter::new(std::io::BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    // All of the walker's own filtering is disabled; the rule set is the
    // single source of truth for exclusions.
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .follow_links(false)
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| CliError::PackageError(e.to_string()))?;
        let path = entry.path();
        if path == root {
            continue;
        }

        let rel = path
            .strip_prefix(root)
            .map_err(|e| CliError::PackageError(e.to_string()))?;
        if rules.is_match(rel) {
            continue;
        }

        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }

        let name = rel.to_string_lossy().replace('\\', "/");
        zip.start_file(name, options)?;
        let mut source = std::fs::File::open(path)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    zip.finish()?;
    let size = std::fs::metadata(&archive_path)?.len();
    debug!("Packaged {} bytes into {}", size, archive_path.display());

    Ok(Archive {
        path: archive_path,
        size,
    })
}

/// Scoped owner of the archive file for one deploy invocation.
///
/// The file is removed when the guard drops, which is every exit path of
/// the pipeline: success, failure, disconnect, timeout and interrupt.
#[derive(Debug)]
pub struct ArchiveGuard {
    path: PathBuf,
    size: u64,
}

impl ArchiveGuard {
    pub fn new(archive: Archive) -> Self {
        Self {
            path: archive.path,
            size: archive.size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for ArchiveGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_always_excluded() {
        let rules = IgnoreRuleSet::builtin().unwrap();
        assert!(rules.is_match(Path::new("node_modules/express/index.js")));
        assert!(rules.is_match(Path::new(".git/HEAD")));
        assert!(rules.is_match(Path::new(".dock/dock.json")));
        assert!(rules.is_match(Path::new("vendor/autoload.php")));
        assert!(rules.is_match(Path::new("project.zip")));
    }

    #[test]
    fn test_hidden_files_included_by_default() {
        let rules = IgnoreRuleSet::builtin().unwrap();
        assert!(!rules.is_match(Path::new(".env.example")));
        assert!(!rules.is_match(Path::new("src/main.js")));
    }

    #[test]
    fn test_user_patterns_appended() {
        let rules =
            IgnoreRuleSet::with_user_patterns(["*.log", "", "# comment", "dist/"]).unwrap();
        assert!(rules.is_match(Path::new("debug.log")));
        // trailing slash implies everything under the directory
        assert!(rules.is_match(Path::new("dist/bundle.js")));
        // comments and blanks are not patterns
        assert!(!rules.is_match(Path::new("# comment")));
        // built-ins are still present
        assert!(rules.is_match(Path::new("node_modules/x")));
    }

    #[test]
    fn test_star_does_not_cross_separators() {
        let rules = IgnoreRuleSet::with_user_patterns(["*.log"]).unwrap();
        assert!(rules.is_match(Path::new("build.log")));
        assert!(!rules.is_match(Path::new("logs/build.log")));

        let rules = IgnoreRuleSet::with_user_patterns(["**/*.log"]).unwrap();
        assert!(rules.is_match(Path::new("logs/nested/build.log")));
    }

    #[test]
    fn test_pattern_order_preserved() {
        let rules = IgnoreRuleSet::with_user_patterns(["first", "second"]).unwrap();
        let patterns = rules.patterns();
        let first = patterns.iter().position(|p| p == "first").unwrap();
        let second = patterns.iter().position(|p| p == "second").unwrap();
        assert!(first < second);
        assert!(patterns.iter().position(|p| p == "node_modules/**").unwrap() < first);
    }
}

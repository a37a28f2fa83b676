//! URI specifications for Nostos imports.
//!
//! An import target is either a local filesystem path or a git repository.
//! Git repositories can be written as an HTTPS URL ending in `.git` or with
//! the `github:owner/repo` shorthand. Parsing is pure; resolving a git spec
//! to a local checkout happens in [`UriSpec::local_path`], which clones into
//! the user cache directory on first use and reuses the clone afterwards.

use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::process::Command;

/// How a spec should be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    /// Local filesystem path.
    Path,
    /// Remote git repository.
    Git,
}

/// A parsed URI specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriSpec {
    /// The specification as written in source.
    pub raw: String,
    pub kind: SpecKind,
    /// Local path, or the remote URL for git specs.
    pub target: String,
}

/// Error resolving a spec to a local path.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("empty path")]
    EmptyPath,
    #[error("failed to create cache directory {0}")]
    CacheDir(PathBuf, #[source] std::io::Error),
    #[error("git clone of {url} failed: {detail}")]
    CloneFailed { url: String, detail: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UriSpec {
    /// Parse a raw specification string.
    ///
    /// `github:<owner>/<repo>` expands to the matching HTTPS remote; HTTP(S)
    /// URLs ending in `.git` are git remotes; everything else is a local
    /// filesystem path.
    pub fn parse(raw: &str) -> UriSpec {
        if let Some(repo) = raw.strip_prefix("github:") {
            return UriSpec {
                raw: raw.to_string(),
                kind: SpecKind::Git,
                target: format!("https://github.com/{repo}.git"),
            };
        }
        if (raw.starts_with("http://") || raw.starts_with("https://")) && raw.ends_with(".git") {
            return UriSpec {
                raw: raw.to_string(),
                kind: SpecKind::Git,
                target: raw.to_string(),
            };
        }
        UriSpec {
            raw: raw.to_string(),
            kind: SpecKind::Path,
            target: raw.to_string(),
        }
    }

    /// Build a path spec directly, bypassing git detection.
    ///
    /// The lexer uses this for path literals, which are always local.
    pub fn local(raw: &str) -> UriSpec {
        UriSpec {
            raw: raw.to_string(),
            kind: SpecKind::Path,
            target: raw.to_string(),
        }
    }

    pub fn is_git(&self) -> bool {
        self.kind == SpecKind::Git
    }

    /// Resolve the spec to a local filesystem path.
    ///
    /// Path specs resolve against `base_dir` when relative. Git specs are
    /// cloned once into `<cache>/nostos/<sha1-of-url>/`; repeated resolutions
    /// of the same URL reuse the clone.
    pub fn local_path(&self, base_dir: &Path) -> Result<PathBuf, SpecError> {
        match self.kind {
            SpecKind::Path => {
                if self.target.is_empty() {
                    return Err(SpecError::EmptyPath);
                }
                let p = Path::new(&self.target);
                if p.is_absolute() {
                    Ok(p.to_path_buf())
                } else {
                    Ok(base_dir.join(p))
                }
            }
            SpecKind::Git => {
                let cache = dirs::cache_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join("nostos");
                std::fs::create_dir_all(&cache)
                    .map_err(|e| SpecError::CacheDir(cache.clone(), e))?;
                let digest = Sha1::digest(self.target.as_bytes());
                let repo_dir = cache.join(hex(&digest));
                if !repo_dir.exists() {
                    clone(&self.target, &repo_dir)?;
                }
                Ok(repo_dir)
            }
        }
    }
}

impl std::fmt::Display for UriSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn clone(url: &str, dest: &Path) -> Result<(), SpecError> {
    let output = Command::new("git")
        .args(["clone", "--depth", "1", url])
        .arg(dest)
        .output()?;
    if !output.status.success() {
        return Err(SpecError::CloneFailed {
            url: url.to_string(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

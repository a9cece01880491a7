//! Audio source resolution
//!
//! Turns a track's raw [`AudioSource`] into a locator the engine can open.
//! Tracks whose source does not resolve are skipped at load time.

use cadence_core::AudioSource;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Resolution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Bundled resource name is blank
    #[error("bundled resource name is blank")]
    BlankName,

    /// No bundled resource with this name
    #[error("no bundled resource named \"{0}\"")]
    NotBundled(String),

    /// Remote locator is not a URL
    #[error("invalid locator \"{locator}\": {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// Remote locator uses a scheme the engine cannot stream
    #[error("unsupported scheme \"{0}\"")]
    UnsupportedScheme(String),
}

/// Resolves audio sources into playable locators
pub trait SourceResolver: Send + Sync {
    /// Resolve `source`
    fn resolve(&self, source: &AudioSource) -> Result<Url, ResolveError>;
}

/// Resolver for bundled resources and http(s) streams
///
/// Bundled names resolve against an optional directory (first file, by name,
/// whose stem matches) and then against a set of registered names, which map
/// to `bundle://<name>`. Remote locators must be http or https URLs.
#[derive(Debug, Clone, Default)]
pub struct BundleResolver {
    bundle_dir: Option<PathBuf>,
    names: BTreeSet<String>,
}

impl BundleResolver {
    /// Resolver with no bundled resources
    pub fn new() -> Self {
        Self::default()
    }

    /// Look bundled names up in `dir`
    #[must_use]
    pub fn with_bundle_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bundle_dir = Some(dir.into());
        self
    }

    /// Register bundled names that resolve to `bundle://<name>`
    #[must_use]
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    fn resolve_bundled(&self, name: &str) -> Result<Url, ResolveError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ResolveError::BlankName);
        }

        if let Some(dir) = &self.bundle_dir {
            if let Some(path) = find_by_stem(dir, name) {
                if let Ok(url) = Url::from_file_path(&path) {
                    return Ok(url);
                }
                tracing::debug!("Bundled file {} has no file URL", path.display());
            }
        }

        if self.names.contains(name) {
            let locator = format!("bundle://{}", name);
            return Url::parse(&locator).map_err(|e| ResolveError::InvalidLocator {
                locator,
                reason: e.to_string(),
            });
        }

        Err(ResolveError::NotBundled(name.to_string()))
    }
}

impl SourceResolver for BundleResolver {
    fn resolve(&self, source: &AudioSource) -> Result<Url, ResolveError> {
        match source {
            AudioSource::Bundled(name) => self.resolve_bundled(name),
            AudioSource::Remote(locator) => resolve_remote(locator),
        }
    }
}

fn resolve_remote(locator: &str) -> Result<Url, ResolveError> {
    let url = Url::parse(locator.trim()).map_err(|e| ResolveError::InvalidLocator {
        locator: locator.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ResolveError::UnsupportedScheme(other.to_string())),
    }
}

/// First regular file in `dir`, in file-name order, whose stem is `stem`
fn find_by_stem(dir: &Path, stem: &str) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot read bundle directory {}: {}", dir.display(), e);
            return None;
        }
    };

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| path.file_stem().is_some_and(|s| s == stem))
        .collect();
    matches.sort();

    let path = matches.into_iter().next()?;
    std::fs::canonicalize(&path).ok().or(Some(path))
}

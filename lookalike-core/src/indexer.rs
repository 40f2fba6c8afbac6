//! Dataset indexing: walk a directory, hash every image, build a store.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{LookalikeError, Result};
use crate::phash::PerceptualHasher;
use crate::store::HashStore;

/// Extensions (lowercase) treated as dataset images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff"];

/// Check whether a file name has a recognized image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// A dataset file that was found but not hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of indexing a dataset directory.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    /// One entry per successfully hashed image
    pub store: HashStore,
    /// Files and directory entries that could not be hashed
    pub skipped: Vec<SkippedFile>,
}

impl IndexReport {
    pub fn hashed(&self) -> usize {
        self.store.len()
    }
}

/// Builds a [`HashStore`] from a dataset directory.
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    hasher: PerceptualHasher,
}

impl Indexer {
    pub fn new(hasher: PerceptualHasher) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &PerceptualHasher {
        &self.hasher
    }

    /// Image files under `root`, directories first at each level and
    /// entries sorted by name. Unreadable entries are returned as skipped.
    pub fn discover(&self, root: &Path) -> Result<(Vec<PathBuf>, Vec<SkippedFile>)> {
        if !root.is_dir() {
            return Err(LookalikeError::DatasetUnavailable {
                path: root.to_path_buf(),
                reason: if root.exists() {
                    "not a directory".into()
                } else {
                    "no such directory".into()
                },
            });
        }

        let mut images = Vec::new();
        let mut skipped = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by(|a, b| {
                b.file_type()
                    .is_dir()
                    .cmp(&a.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            });

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_image_file(entry.path()) => {
                    images.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    warn!(path = %path.display(), error = %e, "Skipping unreadable dataset entry");
                    skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok((images, skipped))
    }

    /// Hash every image under `root`.
    ///
    /// Files that fail to decode are recorded in [`IndexReport::skipped`] and
    /// never abort the build. Fails only when `root` is not a readable
    /// directory. The caller persists the result with [`HashStore::save`].
    pub fn build(&self, root: &Path) -> Result<IndexReport> {
        let (images, mut skipped) = self.discover(root)?;
        let mut store = HashStore::new();

        for path in images {
            let identifier = match relative_identifier(root, &path) {
                Some(identifier) => identifier,
                None => {
                    warn!(path = %path.display(), "Skipping file with non UTF-8 relative path");
                    skipped.push(SkippedFile {
                        path,
                        reason: "relative path is not valid UTF-8".into(),
                    });
                    continue;
                }
            };

            match self.hasher.hash_path(&path) {
                Ok(hash) => {
                    debug!(identifier = %identifier, hash = %hash, "Hashed");
                    store.insert(identifier, &hash);
                }
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "Failed to hash");
                    skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            root = %root.display(),
            hashed = store.len(),
            skipped = skipped.len(),
            "Indexed dataset"
        );

        Ok(IndexReport { store, skipped })
    }
}

/// `path` relative to `root`, components joined with `/`.
pub fn relative_identifier(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Map an identifier back to a file under `root`.
///
/// Returns `None` for identifiers that are empty, absolute, or try to leave
/// the dataset root.
pub fn resolve_identifier(root: &Path, identifier: &str) -> Option<PathBuf> {
    if identifier.is_empty() || identifier.starts_with('/') || identifier.contains('\\') {
        return None;
    }

    let mut resolved = root.to_path_buf();
    for part in identifier.split('/') {
        if part.is_empty() || part == "." || part == ".." {
            return None;
        }
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => resolved.push(part),
            _ => return None,
        }
    }
    Some(resolved)
}

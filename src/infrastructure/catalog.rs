//! Moves OLM manifests from the integreatly-operator repo into the managed-tenants
//! catalog and points the channel's package index at them.

use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{IndexError, PackageIndex, ReleaseTarget};

/// Errors that can occur when writing a release into the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The manifests directory is missing or cannot be listed.
    #[error("failed to read the manifests directory {}", path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The manifests directory holds something other than regular files.
    #[error("unexpected {kind} {} in the manifests directory", path.display())]
    UnsupportedEntryKind { path: PathBuf, kind: &'static str },

    /// The destination directory could not be created.
    #[error("failed to create the directory {}", path.display())]
    DestinationWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A manifest file could not be copied.
    #[error("failed to copy {} to {}", from.display(), to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The package index could not be read.
    #[error("failed to read the package index {}", path.display())]
    IndexReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The package index could not be decoded, validated or encoded.
    #[error("failed to update the package index {}", path.display())]
    PackageIndex {
        path: PathBuf,
        #[source]
        source: IndexError,
    },

    /// The package index could not be written back.
    #[error("failed to write the package index {}", path.display())]
    IndexWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Manifests copied into the catalog by [`transplant`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransplantedManifests {
    /// Manifest directory, relative to the catalog root
    pub directory: PathBuf,
    /// Every copied file, relative to the catalog root, in copy order
    pub files: Vec<PathBuf>,
}

/// Copy the release manifests of `target` from the operator repo into the catalog.
///
/// The manifests directory must be flat. It is listed and checked in full before
/// anything is written, so a subdirectory or symlink fails the transplant without
/// copying any file. Files are copied in file-name order.
///
/// # Errors
///
/// Returns [`CatalogError::SourceNotFound`] if the source directory cannot be listed,
/// [`CatalogError::UnsupportedEntryKind`] if it holds anything but regular files,
/// [`CatalogError::DestinationWriteFailed`] if the destination cannot be created and
/// [`CatalogError::CopyFailed`] if a file cannot be copied.
pub fn transplant(
    operator_root: &Path,
    catalog_root: &Path,
    target: &ReleaseTarget,
) -> Result<TransplantedManifests, CatalogError> {
    let source = operator_root.join(target.source_manifest_dir());
    let relative_destination = target.destination_manifest_dir();
    let destination = catalog_root.join(&relative_destination);

    info!(
        "copy files from {} to {}",
        source.display(),
        destination.display()
    );

    let entries = list_manifest_files(&source)?;

    fs::create_dir_all(&destination).map_err(|source| CatalogError::DestinationWriteFailed {
        path: destination.clone(),
        source,
    })?;

    let mut files = Vec::with_capacity(entries.len());
    for (name, from) in entries {
        let to = destination.join(&name);
        debug!("copy {} to {}", from.display(), to.display());

        fs::copy(&from, &to).map_err(|source| CatalogError::CopyFailed {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
        files.push(relative_destination.join(name));
    }

    Ok(TransplantedManifests {
        directory: relative_destination,
        files,
    })
}

/// Point the channel's package index at the version of `target`.
///
/// The file is rewritten only once the new document has been fully built.
///
/// # Errors
///
/// Returns [`CatalogError::IndexReadFailed`] if the index cannot be read,
/// [`CatalogError::PackageIndex`] if it cannot be decoded, has an unexpected shape or
/// cannot be encoded, and [`CatalogError::IndexWriteFailed`] if it cannot be written.
pub fn update_package_index(
    catalog_root: &Path,
    target: &ReleaseTarget,
) -> Result<PathBuf, CatalogError> {
    let relative = target.package_index_path();
    let path = catalog_root.join(&relative);

    let content = fs::read_to_string(&path).map_err(|source| CatalogError::IndexReadFailed {
        path: path.clone(),
        source,
    })?;

    let index_error = |source| CatalogError::PackageIndex {
        path: path.clone(),
        source,
    };

    let mut index = PackageIndex::parse(&content).map_err(index_error)?;
    let current_csv = target.current_csv();
    info!(
        "update {} from {} to {current_csv}",
        relative.display(),
        index.current_csv()
    );
    index.set_current_csv(current_csv);
    let updated = index.to_yaml().map_err(index_error)?;

    fs::write(&path, updated).map_err(|source| CatalogError::IndexWriteFailed {
        path: path.clone(),
        source,
    })?;

    Ok(relative)
}

/// Regular files of a flat directory as `(file name, path)`, sorted by name
fn list_manifest_files(
    source: &Path,
) -> Result<Vec<(std::ffi::OsString, PathBuf)>, CatalogError> {
    let not_found = |e| CatalogError::SourceNotFound {
        path: source.to_path_buf(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(source).map_err(not_found)? {
        let entry = entry.map_err(not_found)?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(not_found)?;

        if file_type.is_symlink() {
            return Err(CatalogError::UnsupportedEntryKind {
                path,
                kind: "symlink",
            });
        }
        if file_type.is_dir() {
            return Err(CatalogError::UnsupportedEntryKind {
                path,
                kind: "directory",
            });
        }
        if !file_type.is_file() {
            return Err(CatalogError::UnsupportedEntryKind {
                path,
                kind: "special file",
            });
        }

        files.push((entry.file_name(), path));
    }

    files.sort();
    Ok(files)
}

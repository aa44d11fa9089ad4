// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Persisted records of contributions, used to discover declarations contributed by earlier,
//! separate compilations without re-parsing their sources.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::contribution::ContributionKind;
use crate::names::FqName;
use crate::{Error, Result};

/// Records that a declaration was contributed to a scope with a given kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Marker {
    declaration: FqName,
    scope: FqName,
    kind: ContributionKind,
}

impl Marker {
    /// Creates a marker.
    #[must_use]
    pub fn new(declaration: FqName, scope: FqName, kind: ContributionKind) -> Self {
        Self { declaration, scope, kind }
    }

    /// The contributed declaration.
    #[must_use]
    pub fn declaration(&self) -> &FqName {
        &self.declaration
    }

    /// The scope contributed to.
    #[must_use]
    pub fn scope(&self) -> &FqName {
        &self.scope
    }

    /// The contribution kind.
    #[must_use]
    pub fn kind(&self) -> ContributionKind {
        self.kind
    }
}

/// Storage for [`Marker`] records shared between compilations.
pub trait MarkerStore: std::fmt::Debug {
    /// Persists `marker`. Writing a marker that already exists is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a marker error if the record cannot be persisted.
    fn write_marker(&mut self, marker: &Marker) -> Result<()>;

    /// Lists markers of `kind`, optionally restricted to one scope, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns a marker error if the records cannot be read or decoded.
    fn list_markers(&self, kind: ContributionKind, scope: Option<&FqName>) -> Result<Vec<Marker>>;

    /// Removes `marker`. Removing a marker that does not exist is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a marker error if the record cannot be removed.
    fn remove_marker(&mut self, marker: &Marker) -> Result<()>;
}

/// Keeps markers in memory for the lifetime of the store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMarkerStore {
    markers: BTreeSet<Marker>,
}

impl InMemoryMarkerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct markers written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether no marker was written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl MarkerStore for InMemoryMarkerStore {
    fn write_marker(&mut self, marker: &Marker) -> Result<()> {
        self.markers.insert(marker.clone());
        Ok(())
    }

    fn list_markers(&self, kind: ContributionKind, scope: Option<&FqName>) -> Result<Vec<Marker>> {
        Ok(self
            .markers
            .iter()
            .filter(|m| m.kind == kind && scope.is_none_or(|s| *s == m.scope))
            .cloned()
            .collect())
    }

    fn remove_marker(&mut self, marker: &Marker) -> Result<()> {
        self.markers.remove(marker);
        Ok(())
    }
}

/// Stores one JSON file per marker under `<root>/<kind>/<declaration>@<scope>.json`.
///
/// The directory is meant to be shipped with the compiled artifacts so that dependent compilations
/// can point their own store at it.
#[derive(Debug, Clone)]
pub struct DirectoryMarkerStore {
    root: PathBuf,
}

impl DirectoryMarkerStore {
    /// Creates a store rooted at `root`. The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_directory(&self, kind: ContributionKind) -> PathBuf {
        self.root.join(kind.key())
    }

    fn path(&self, marker: &Marker) -> PathBuf {
        self.kind_directory(marker.kind)
            .join(format!("{}@{}.json", marker.declaration, marker.scope))
    }
}

impl MarkerStore for DirectoryMarkerStore {
    fn write_marker(&mut self, marker: &Marker) -> Result<()> {
        let path = self.path(marker);
        if path.exists() {
            return Ok(());
        }

        let directory = self.kind_directory(marker.kind);
        fs::create_dir_all(&directory)
            .map_err(|e| Error::marker(format!("failed to create marker directory {}", directory.display()), e))?;

        let contents = serde_json::to_vec_pretty(marker)
            .map_err(|e| Error::marker(format!("failed to encode marker for {}", marker.declaration), e))?;

        fs::write(&path, contents).map_err(|e| Error::marker(format!("failed to write marker {}", path.display()), e))?;

        tracing::event!(
            name: "weld.marker.written",
            tracing::Level::DEBUG,
            weld.path = %path.display(),
        );

        Ok(())
    }

    fn list_markers(&self, kind: ContributionKind, scope: Option<&FqName>) -> Result<Vec<Marker>> {
        let directory = self.kind_directory(kind);
        let entries = match fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::marker(format!("failed to list markers in {}", directory.display()), e)),
        };

        let mut markers = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| Error::marker(format!("failed to list markers in {}", directory.display()), e))?
                .path();

            if path.extension().is_none_or(|extension| extension != "json") {
                continue;
            }

            let contents =
                fs::read(&path).map_err(|e| Error::marker(format!("failed to read marker {}", path.display()), e))?;
            let marker: Marker = serde_json::from_slice(&contents)
                .map_err(|e| Error::marker(format!("failed to decode marker {}", path.display()), e))?;

            if marker.kind == kind && scope.is_none_or(|s| *s == marker.scope) {
                markers.push(marker);
            }
        }

        markers.sort();
        Ok(markers)
    }

    fn remove_marker(&mut self, marker: &Marker) -> Result<()> {
        let path = self.path(marker);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::marker(format!("failed to remove marker {}", path.display()), e)),
        }

        tracing::event!(
            name: "weld.marker.removed",
            tracing::Level::DEBUG,
            weld.path = %path.display(),
        );

        Ok(())
    }
}

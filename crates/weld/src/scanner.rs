// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashSet;

use crate::contribution::{Contribution, ContributionKind};
use crate::index::{ContributionIndex, Round};
use crate::markers::{Marker, MarkerStore};
use crate::names::FqName;
use crate::symbols::{Declaration, Symbols};
use crate::{Error, ErrorKind, Result};

/// Projects visible declarations and marker records into the [`ContributionIndex`].
///
/// The scanner is invoked once per round. Source declarations are scanned once each and a marker
/// is written for every contribution they make. Markers of classpath declarations are resolved
/// against the classpath; markers of declarations that are not visible are ignored.
///
/// Markers of source declarations are never read back. Those the current sources no longer make,
/// left behind by an earlier run of the same compilation, are removed from the store.
#[derive(Debug, Default)]
pub struct ClassScanner {
    scanned: HashSet<FqName>,
    written: HashSet<Marker>,
}

impl ClassScanner {
    /// Creates a scanner that has not seen any declaration yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings `index` up to date with everything visible in `round`.
    ///
    /// Returns the number of contributions added to the index.
    ///
    /// # Errors
    ///
    /// Fails if a contribution is malformed, if the marker store fails, or if a marker refers to a
    /// classpath declaration that no longer makes the recorded contribution.
    pub fn refresh(
        &mut self,
        symbols: &Symbols<'_>,
        markers: &mut dyn MarkerStore,
        index: &mut ContributionIndex,
        round: Round,
    ) -> Result<usize> {
        let mut sources: Vec<&Declaration> = symbols
            .source_declarations()
            .filter(|declaration| !self.scanned.contains(&declaration.fq_name()))
            .collect();
        sources.sort_by(|a, b| a.id().cmp(b.id()));

        let mut added = 0;

        for declaration in sources {
            for contribution in symbols.contributions(declaration)? {
                let marker = Marker::new(
                    contribution.declaration().clone(),
                    contribution.scope().clone(),
                    contribution.kind(),
                );
                markers.write_marker(&marker)?;
                self.written.insert(marker);

                if index.record(round, contribution) {
                    added += 1;
                }
            }

            self.scanned.insert(declaration.fq_name());
        }

        for kind in ContributionKind::ALL {
            for marker in markers.list_markers(kind, None)? {
                if self.scanned.contains(marker.declaration()) {
                    if !self.written.contains(&marker) {
                        markers.remove_marker(&marker)?;
                    }
                    continue;
                }

                if index.contains(kind, marker.scope(), marker.declaration()) {
                    continue;
                }

                let Some(declaration) = symbols.find(marker.declaration()) else {
                    tracing::event!(
                        name: "weld.marker.skipped",
                        tracing::Level::DEBUG,
                        weld.declaration = %marker.declaration(),
                        weld.scope = %marker.scope(),
                    );
                    continue;
                };

                if index.record(round, resolve_marker(symbols, declaration, &marker)?) {
                    added += 1;
                }
            }
        }

        tracing::event!(
            name: "weld.index.refreshed",
            tracing::Level::DEBUG,
            weld.round = round.number(),
            weld.index.added = added,
            weld.index.size = index.len(),
        );

        Ok(added)
    }
}

fn resolve_marker(symbols: &Symbols<'_>, declaration: &Declaration, marker: &Marker) -> Result<Contribution> {
    symbols
        .contributions(declaration)?
        .into_iter()
        .find(|c| c.kind() == marker.kind() && c.scope() == marker.scope())
        .ok_or_else(|| {
            Error::at(
                ErrorKind::Marker,
                declaration,
                format!(
                    "A marker records {declaration} as contributed to {} with {}, but the declaration no longer makes \
                     this contribution. The marker is out of date.",
                    marker.scope(),
                    marker.kind()
                ),
            )
        })
}

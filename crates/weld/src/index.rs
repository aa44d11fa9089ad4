// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{BTreeMap, btree_map};
use std::fmt;

use serde::Serialize;

use crate::contribution::{Contribution, ContributionKind};
use crate::names::FqName;

/// A compilation round. Rounds are numbered from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Round(u32);

impl Round {
    /// The first round of a compilation.
    pub const FIRST: Self = Self(1);

    /// Creates a round from its number.
    #[must_use]
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// The round number.
    #[must_use]
    pub fn number(self) -> u32 {
        self.0
    }

    /// The round after this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {}", self.0)
    }
}

/// A contribution together with the round it was first observed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    round: Round,
    contribution: Contribution,
}

impl IndexEntry {
    /// The round the contribution was first observed in.
    #[must_use]
    pub fn round(&self) -> Round {
        self.round
    }

    /// The contribution.
    #[must_use]
    pub fn contribution(&self) -> &Contribution {
        &self.contribution
    }
}

/// An append-only, round-stamped log of every contribution observed so far.
///
/// Entries are never retracted, so any query answered in round `N` is also answered, with possibly
/// more results, in every later round. Keyed queries return contributions ordered by declaration
/// name; wildcard queries return them in observation order.
#[derive(Debug, Default)]
pub struct ContributionIndex {
    log: Vec<IndexEntry>,
    by_key: BTreeMap<(ContributionKind, FqName), BTreeMap<FqName, usize>>,
}

impl ContributionIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `contribution` unless the same (kind, scope, declaration) triple is already known.
    ///
    /// Returns whether the contribution was new.
    pub fn record(&mut self, round: Round, contribution: Contribution) -> bool {
        let key = (contribution.kind(), contribution.scope().clone());
        let declarations = self.by_key.entry(key).or_default();

        match declarations.entry(contribution.declaration().clone()) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(vacant) => {
                vacant.insert(self.log.len());
                self.log.push(IndexEntry { round, contribution });
                true
            }
        }
    }

    /// Contributions of `kind`, to `scope` or to any scope when `scope` is `None`.
    ///
    /// The returned iterator is lazy and can be cloned to restart the query.
    #[must_use]
    pub fn find_contributed(&self, scope: Option<&FqName>, kind: ContributionKind) -> Contributions<'_> {
        let inner = match scope {
            Some(scope) => match self.by_key.get(&(kind, scope.clone())) {
                Some(declarations) => ContributionsInner::Keyed(declarations.values()),
                None => ContributionsInner::Empty,
            },
            None => ContributionsInner::Wildcard(self.log.iter()),
        };

        Contributions {
            log: &self.log,
            kind,
            inner,
        }
    }

    /// Whether `declaration` is already known as contributed to `scope` with `kind`.
    #[must_use]
    pub fn contains(&self, kind: ContributionKind, scope: &FqName, declaration: &FqName) -> bool {
        self.by_key
            .get(&(kind, scope.clone()))
            .is_some_and(|declarations| declarations.contains_key(declaration))
    }

    /// All entries in observation order.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.log
    }

    /// Number of recorded contributions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

/// Iterator returned by [`ContributionIndex::find_contributed`].
#[derive(Debug, Clone)]
pub struct Contributions<'a> {
    log: &'a [IndexEntry],
    kind: ContributionKind,
    inner: ContributionsInner<'a>,
}

#[derive(Debug, Clone)]
enum ContributionsInner<'a> {
    Empty,
    Keyed(btree_map::Values<'a, FqName, usize>),
    Wildcard(std::slice::Iter<'a, IndexEntry>),
}

impl<'a> Iterator for Contributions<'a> {
    type Item = &'a Contribution;

    fn next(&mut self) -> Option<Self::Item> {
        let log = self.log;
        let kind = self.kind;

        match &mut self.inner {
            ContributionsInner::Empty => None,
            ContributionsInner::Keyed(positions) => positions
                .next()
                .and_then(|&position| log.get(position))
                .map(IndexEntry::contribution),
            ContributionsInner::Wildcard(entries) => entries
                .by_ref()
                .map(IndexEntry::contribution)
                .find(|contribution| contribution.kind() == kind),
        }
    }
}

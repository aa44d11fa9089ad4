// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::names::FqName;
use crate::symbols::{Annotation, Declaration, Symbols};
use crate::{Error, ErrorKind, Result};

/// The kind of a contribution annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContributionKind {
    /// `ContributesTo`
    #[serde(rename = "contributes_to")]
    To,
    /// `ContributesBinding`
    #[serde(rename = "contributes_binding")]
    Binding,
    /// `ContributesMultibinding`
    #[serde(rename = "contributes_multibinding")]
    Multibinding,
    /// `ContributesSubcomponent`
    #[serde(rename = "contributes_subcomponent")]
    Subcomponent,
}

impl ContributionKind {
    /// Every contribution kind.
    pub const ALL: [Self; 4] = [Self::To, Self::Binding, Self::Multibinding, Self::Subcomponent];

    /// Kinds whose contributions can replace each other.
    pub const REPLACEABLE: [Self; 3] = [Self::To, Self::Binding, Self::Multibinding];

    /// The stable, file-system friendly name of the kind.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::To => "contributes_to",
            Self::Binding => "contributes_binding",
            Self::Multibinding => "contributes_multibinding",
            Self::Subcomponent => "contributes_subcomponent",
        }
    }
}

impl fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::To => "ContributesTo",
            Self::Binding => "ContributesBinding",
            Self::Multibinding => "ContributesMultibinding",
            Self::Subcomponent => "ContributesSubcomponent",
        };

        f.write_str(name)
    }
}

/// Kind-specific metadata of a [`Contribution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributionDetails {
    /// An interface or DI module contributed with `ContributesTo`.
    To {
        /// Replaced contributions.
        replaces: Vec<FqName>,
    },

    /// A binding.
    Binding {
        /// Replaced contributions.
        replaces: Vec<FqName>,
        /// Explicitly bound supertype.
        bound_type: Option<FqName>,
    },

    /// A multibinding.
    Multibinding {
        /// Replaced contributions.
        replaces: Vec<FqName>,
        /// Explicitly bound supertype.
        bound_type: Option<FqName>,
    },

    /// A contributed subcomponent.
    Subcomponent {
        /// Scope of the merge points the subcomponent is added to.
        parent_scope: FqName,
        /// DI modules added to the generated subcomponent.
        modules: Vec<FqName>,
        /// Contributions excluded from the generated subcomponent.
        exclude: Vec<FqName>,
    },
}

/// A declaration contributed to a scope.
///
/// Contributions are immutable once extracted; the index only ever appends them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    declaration: FqName,
    scope: FqName,
    details: ContributionDetails,
}

impl Contribution {
    /// Creates a contribution without validating it against the host model.
    #[must_use]
    pub fn new(declaration: FqName, scope: FqName, details: ContributionDetails) -> Self {
        Self {
            declaration,
            scope,
            details,
        }
    }

    /// Extracts and validates every contribution annotation of `declaration`.
    ///
    /// # Errors
    ///
    /// - a resolution error if a scope cannot be resolved;
    /// - a structural error if the declaration is contributed to, or replaces, one of its own
    ///   enclosing declarations;
    /// - an invariant violation if the same kind is contributed twice to one scope.
    pub fn extract(symbols: &Symbols<'_>, declaration: &Declaration) -> Result<Vec<Self>> {
        let mut contributions: Vec<Self> = Vec::new();

        for annotation in declaration.annotations() {
            let (scope, details) = match annotation {
                Annotation::ContributesTo { scope, replaces } => (
                    scope,
                    ContributionDetails::To {
                        replaces: replaces.clone(),
                    },
                ),
                Annotation::ContributesBinding {
                    scope,
                    replaces,
                    bound_type,
                } => (
                    scope,
                    ContributionDetails::Binding {
                        replaces: replaces.clone(),
                        bound_type: bound_type.clone(),
                    },
                ),
                Annotation::ContributesMultibinding {
                    scope,
                    replaces,
                    bound_type,
                } => (
                    scope,
                    ContributionDetails::Multibinding {
                        replaces: replaces.clone(),
                        bound_type: bound_type.clone(),
                    },
                ),
                Annotation::ContributesSubcomponent {
                    scope,
                    parent_scope,
                    modules,
                    exclude,
                } => (
                    scope,
                    ContributionDetails::Subcomponent {
                        parent_scope: parent_scope.clone(),
                        modules: modules.clone(),
                        exclude: exclude.clone(),
                    },
                ),
                _ => continue,
            };

            let contribution = Self::new(declaration.fq_name(), scope.clone(), details);
            contribution.check_not_outer(declaration)?;

            symbols.require(contribution.scope(), declaration)?;
            if let Some(parent_scope) = contribution.parent_scope() {
                symbols.require(parent_scope, declaration)?;
            }

            if contributions
                .iter()
                .any(|c| c.kind() == contribution.kind() && c.scope() == contribution.scope())
            {
                return Err(Error::at(
                    ErrorKind::InvariantViolation,
                    declaration,
                    format!(
                        "{declaration} is annotated with {} multiple times for the scope {}.",
                        contribution.kind(),
                        contribution.scope()
                    ),
                ));
            }

            contributions.push(contribution);
        }

        Ok(contributions)
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

    /// Kind-specific metadata.
    #[must_use]
    pub fn details(&self) -> &ContributionDetails {
        &self.details
    }

    /// The annotation kind the contribution was made with.
    #[must_use]
    pub fn kind(&self) -> ContributionKind {
        match self.details {
            ContributionDetails::To { .. } => ContributionKind::To,
            ContributionDetails::Binding { .. } => ContributionKind::Binding,
            ContributionDetails::Multibinding { .. } => ContributionKind::Multibinding,
            ContributionDetails::Subcomponent { .. } => ContributionKind::Subcomponent,
        }
    }

    /// Contributions this one replaces. Always empty for subcomponents.
    #[must_use]
    pub fn replaces(&self) -> &[FqName] {
        match &self.details {
            ContributionDetails::To { replaces }
            | ContributionDetails::Binding { replaces, .. }
            | ContributionDetails::Multibinding { replaces, .. } => replaces,
            ContributionDetails::Subcomponent { .. } => &[],
        }
    }

    /// The parent scope of a contributed subcomponent.
    #[must_use]
    pub fn parent_scope(&self) -> Option<&FqName> {
        match &self.details {
            ContributionDetails::Subcomponent { parent_scope, .. } => Some(parent_scope),
            _ => None,
        }
    }

    fn check_not_outer(&self, declaration: &Declaration) -> Result<()> {
        let outer: Vec<FqName> = declaration.id().enclosing().map(|id| id.fq_name()).collect();
        let referenced = std::iter::once(&self.scope)
            .chain(self.replaces())
            .chain(self.parent_scope());

        for name in referenced {
            if outer.contains(name) {
                return Err(Error::at(
                    ErrorKind::Structural,
                    declaration,
                    "It seems like you tried to contribute an inner class to its outer class. This is not supported \
                     and results in a compiler error.",
                ));
            }
        }

        Ok(())
    }
}

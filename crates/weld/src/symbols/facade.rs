// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::contribution::{Contribution, ContributionKind};
use crate::names::FqName;
use crate::symbols::{Annotation, Declaration, MergeAnnotation, SemanticModel, Visibility};
use crate::{Error, ErrorKind, Result};

/// Read-only accessors over the host's [`SemanticModel`].
///
/// All higher layers of the engine talk to the host exclusively through this facade. It performs
/// no caching of its own and never mutates the model.
#[derive(Clone, Copy)]
pub struct Symbols<'a> {
    model: &'a dyn SemanticModel,
}

impl<'a> Symbols<'a> {
    /// Creates a facade over `model`.
    #[must_use]
    pub fn new(model: &'a dyn SemanticModel) -> Self {
        Self { model }
    }

    /// Looks up a declaration.
    #[must_use]
    pub fn find(&self, name: &FqName) -> Option<&'a Declaration> {
        self.model.find(name)
    }

    /// Resolves `name`, which is referenced by `referenced_by`.
    ///
    /// # Errors
    ///
    /// Returns a resolution error attached to `referenced_by` when the name cannot be resolved.
    pub fn require(&self, name: &FqName, referenced_by: &Declaration) -> Result<&'a Declaration> {
        self.find(name).ok_or_else(|| {
            Error::at(
                ErrorKind::Resolution,
                referenced_by,
                format!("Couldn't resolve FqName {name} for {referenced_by}."),
            )
        })
    }

    /// Declarations of the current compilation, including generated ones.
    pub fn source_declarations(&self) -> impl Iterator<Item = &'a Declaration> + 'a {
        self.model.source_declarations()
    }

    /// Declarations nested directly inside `declaration`.
    #[must_use]
    pub fn nested(&self, declaration: &Declaration) -> Vec<&'a Declaration> {
        self.model.nested(declaration.id())
    }

    /// Whether `declaration` is visible everywhere: it and all its enclosing declarations must be
    /// public. Enclosing declarations unknown to the host do not restrict visibility.
    #[must_use]
    pub fn is_public(&self, declaration: &Declaration) -> bool {
        declaration.visibility() == Visibility::Public
            && declaration
                .id()
                .enclosing()
                .all(|outer| self.find(&outer.fq_name()).is_none_or(|d| d.visibility() == Visibility::Public))
    }

    /// The transitive closure of the declared supertypes of `declaration`, in breadth-first order.
    ///
    /// Supertypes the host cannot resolve are reported but not expanded further.
    #[must_use]
    pub fn all_supertypes(&self, declaration: &Declaration) -> Vec<FqName> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<FqName> = declaration.supertypes().iter().cloned().collect();
        let mut result = Vec::new();

        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }

            if let Some(supertype) = self.find(&name) {
                queue.extend(supertype.supertypes().iter().cloned());
            }

            result.push(name);
        }

        result
    }

    /// The single merge annotation of `declaration`, if it has one.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the declaration carries more than one merge annotation.
    pub fn merge_annotation(&self, declaration: &Declaration) -> Result<Option<MergeAnnotation>> {
        let mut merges = declaration.annotations().iter().filter_map(Annotation::as_merge);
        let first = merges.next();

        if merges.next().is_some() {
            return Err(Error::at(
                ErrorKind::InvariantViolation,
                declaration,
                format!("{declaration} carries more than one merge annotation. Only one is allowed."),
            ));
        }

        Ok(first)
    }

    /// The validated contributions `declaration` makes.
    ///
    /// # Errors
    ///
    /// See [`Contribution::extract`].
    pub fn contributions(&self, declaration: &Declaration) -> Result<Vec<Contribution>> {
        Contribution::extract(self, declaration)
    }

    /// The scopes `declaration` contributes to with any of `kinds`, read from its annotations.
    ///
    /// For contributed subcomponents the parent scope is reported, since that is the scope of the
    /// merge points the subcomponent is added to.
    #[must_use]
    pub fn contribution_scopes(&self, declaration: &Declaration, kinds: &[ContributionKind]) -> Vec<FqName> {
        let mut scopes = Vec::new();

        for annotation in declaration.annotations() {
            let scope = match annotation {
                Annotation::ContributesTo { scope, .. } if kinds.contains(&ContributionKind::To) => scope,
                Annotation::ContributesBinding { scope, .. } if kinds.contains(&ContributionKind::Binding) => scope,
                Annotation::ContributesMultibinding { scope, .. } if kinds.contains(&ContributionKind::Multibinding) => {
                    scope
                }
                Annotation::ContributesSubcomponent { parent_scope, .. }
                    if kinds.contains(&ContributionKind::Subcomponent) =>
                {
                    parent_scope
                }
                _ => continue,
            };

            if !scopes.contains(scope) {
                scopes.push(scope.clone());
            }
        }

        scopes
    }

    /// Scope annotations such as `javax.inject.Singleton` carried by `declaration`.
    #[must_use]
    pub fn scope_annotations(&self, declaration: &Declaration) -> Vec<FqName> {
        declaration
            .annotations()
            .iter()
            .filter_map(|annotation| match annotation {
                Annotation::Scoped(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Debug for Symbols<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbols").finish_non_exhaustive()
    }
}

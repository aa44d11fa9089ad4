// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

use crate::names::FqName;

/// The closed vocabulary of annotations the engine understands.
///
/// Annotations are externally tagged in their serialized form, for example
/// `{ "contributes_to": { "scope": "kotlin.Unit" } }` or the bare string `"module"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Annotation {
    /// Contributes an interface or DI module to a scope.
    ContributesTo {
        /// Target scope.
        scope: FqName,
        /// Contributions of the same scope this one replaces.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        replaces: Vec<FqName>,
    },

    /// Contributes a binding of the declaration to one of its supertypes.
    ContributesBinding {
        /// Target scope.
        scope: FqName,
        /// Contributions of the same scope this one replaces.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        replaces: Vec<FqName>,
        /// The bound supertype, inferred by the DI framework when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bound_type: Option<FqName>,
    },

    /// Contributes the declaration into a multibinding set.
    ContributesMultibinding {
        /// Target scope.
        scope: FqName,
        /// Contributions of the same scope this one replaces.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        replaces: Vec<FqName>,
        /// The bound supertype, inferred by the DI framework when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bound_type: Option<FqName>,
    },

    /// Contributes the declaration as a subcomponent of every merge point for `parent_scope`.
    ContributesSubcomponent {
        /// Scope of the subcomponent itself.
        scope: FqName,
        /// Scope of the components this subcomponent is added to.
        parent_scope: FqName,
        /// DI modules added to the generated subcomponent.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        modules: Vec<FqName>,
        /// Contributions excluded from the generated subcomponent.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<FqName>,
    },

    /// Marks the factory abstraction nested inside a contributed subcomponent.
    SubcomponentFactory,

    /// Merge point producing a DI component.
    MergeComponent(MergeArguments),

    /// Merge point producing a DI subcomponent.
    MergeSubcomponent(MergeArguments),

    /// Merge point that only merges contributed interfaces.
    MergeInterfaces(MergeArguments),

    /// Merge point that only merges contributed DI modules.
    MergeModules(MergeArguments),

    /// The declaration is a DI module.
    Module,

    /// The declaration is a DI component handled by the DI framework itself.
    Component,

    /// The declaration is a DI subcomponent handled by the DI framework itself.
    Subcomponent,

    /// A scope annotation such as `javax.inject.Singleton`, copied onto generated subcomponents.
    Scoped(FqName),
}

impl Annotation {
    /// Returns the merge annotation if this is one.
    #[must_use]
    pub fn as_merge(&self) -> Option<MergeAnnotation> {
        let (kind, arguments) = match self {
            Self::MergeComponent(arguments) => (MergeKind::Component, arguments),
            Self::MergeSubcomponent(arguments) => (MergeKind::Subcomponent, arguments),
            Self::MergeInterfaces(arguments) => (MergeKind::Interfaces, arguments),
            Self::MergeModules(arguments) => (MergeKind::Modules, arguments),
            _ => return None,
        };

        Some(MergeAnnotation {
            kind,
            arguments: arguments.clone(),
        })
    }
}

/// Arguments shared by all merge annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeArguments {
    /// The scope whose contributions are merged.
    pub scope: FqName,
    /// DI modules added explicitly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<FqName>,
    /// Contributions that must not be merged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<FqName>,
}

impl MergeArguments {
    /// Creates arguments merging `scope` without modules or exclusions.
    pub fn new(scope: impl Into<FqName>) -> Self {
        Self {
            scope: scope.into(),
            modules: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Adds an excluded declaration.
    #[must_use]
    pub fn exclude(mut self, name: impl Into<FqName>) -> Self {
        self.exclude.push(name.into());
        self
    }

    /// Adds an explicitly listed DI module.
    #[must_use]
    pub fn module(mut self, name: impl Into<FqName>) -> Self {
        self.modules.push(name.into());
        self
    }
}

/// Which merge annotation a merge point carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeKind {
    /// `MergeComponent`
    Component,
    /// `MergeSubcomponent`
    Subcomponent,
    /// `MergeInterfaces`
    Interfaces,
    /// `MergeModules`
    Modules,
}

impl MergeKind {
    /// Whether contributed interfaces are merged into the supertypes of the merge point.
    #[must_use]
    pub fn merges_interfaces(self) -> bool {
        !matches!(self, Self::Modules)
    }

    /// Whether DI modules, bindings and multibindings are merged.
    #[must_use]
    pub fn merges_modules(self) -> bool {
        !matches!(self, Self::Interfaces)
    }
}

/// The merge annotation of a merge point, as returned by
/// [`Symbols::merge_annotation`](crate::symbols::Symbols::merge_annotation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeAnnotation {
    kind: MergeKind,
    arguments: MergeArguments,
}

impl MergeAnnotation {
    /// Creates a merge annotation.
    #[must_use]
    pub fn new(kind: MergeKind, arguments: MergeArguments) -> Self {
        Self { kind, arguments }
    }

    /// The annotation kind.
    #[must_use]
    pub fn kind(&self) -> MergeKind {
        self.kind
    }

    /// The merged scope.
    #[must_use]
    pub fn scope(&self) -> &FqName {
        &self.arguments.scope
    }

    /// Explicitly listed DI modules.
    #[must_use]
    pub fn modules(&self) -> &[FqName] {
        &self.arguments.modules
    }

    /// Excluded declarations.
    #[must_use]
    pub fn exclude(&self) -> &[FqName] {
        &self.arguments.exclude
    }
}

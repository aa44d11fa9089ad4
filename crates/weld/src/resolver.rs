// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashSet;

use serde::Serialize;

use crate::contribution::{Contribution, ContributionKind};
use crate::index::ContributionIndex;
use crate::names::FqName;
use crate::naming;
use crate::symbols::{Declaration, MergeAnnotation, Symbols};
use crate::{Error, ErrorKind, Result};

/// DI modules and bindings merged into a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedModules {
    /// Contributed and explicitly listed DI modules.
    pub modules: Vec<FqName>,
    /// Contributed bindings.
    pub bindings: Vec<FqName>,
    /// Contributed multibindings.
    pub multibindings: Vec<FqName>,
}

impl MergedModules {
    /// Whether nothing was merged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.bindings.is_empty() && self.multibindings.is_empty()
    }
}

/// Computes what a merge point receives from its scope, applying replacement and exclusion rules.
///
/// The resolver reads an immutable snapshot of the index, so resolving one merge point never
/// observes partial results of another.
#[derive(Debug, Clone, Copy)]
pub struct ContributionResolver<'a> {
    symbols: Symbols<'a>,
    index: &'a ContributionIndex,
}

impl<'a> ContributionResolver<'a> {
    /// Creates a resolver over the given index snapshot.
    #[must_use]
    pub fn new(symbols: Symbols<'a>, index: &'a ContributionIndex) -> Self {
        Self { symbols, index }
    }

    /// Computes the contributed interfaces merged into the supertypes of `merge_point`.
    ///
    /// The result contains each contributed interface that is neither replaced nor excluded, plus
    /// the generated parent accessor interfaces of subcomponents contributed to the merged scope.
    /// Its order is deterministic but carries no meaning.
    ///
    /// # Errors
    ///
    /// - a visibility error if a contributed interface is not public;
    /// - a type, resolution or scope mismatch error for an invalid replacement;
    /// - a resolution or scope mismatch error for an invalid exclusion;
    /// - an invariant violation if an excluded type is inherited explicitly.
    pub fn resolve_for_merge(&self, merge_point: &Declaration, merge: &MergeAnnotation) -> Result<Vec<FqName>> {
        let scope = merge.scope();

        let mut contributed = Vec::new();
        for contribution in self.index.find_contributed(Some(scope), ContributionKind::To) {
            let declaration = self.declaration_of(contribution)?;
            if !declaration.is_interface() || declaration.is_module() {
                continue;
            }

            if !self.symbols.is_public(declaration) {
                return Err(Error::at(
                    ErrorKind::Visibility,
                    declaration,
                    format!(
                        "{declaration} is contributed to the DI graph, but the interface is not public. Only public \
                         interfaces are supported."
                    ),
                ));
            }

            contributed.push((declaration, contribution));
        }

        let replaced = self.replaced(contributed.iter().map(|(d, c)| (*d, *c)), scope, true)?;
        let excluded = self.excluded(merge_point, merge)?;

        if !excluded.is_empty() {
            let inherited: Vec<String> = self
                .symbols
                .all_supertypes(merge_point)
                .into_iter()
                .filter(|supertype| excluded.contains(supertype))
                .map(|supertype| supertype.to_string())
                .collect();

            if !inherited.is_empty() {
                return Err(Error::at(
                    ErrorKind::InvariantViolation,
                    merge_point,
                    format!(
                        "{} excludes types that it implements or extends. These types cannot be excluded. Look at all \
                         the super types to find these classes: {}",
                        merge_point.id().simple_name(),
                        inherited.join(", ")
                    ),
                ));
            }
        }

        let mut seen = HashSet::new();
        let mut result = Vec::new();

        let candidates = contributed
            .iter()
            .map(|(declaration, _)| declaration.fq_name())
            .filter(|name| !replaced.contains(name) && !excluded.contains(name))
            .chain(self.subcomponent_parent_interfaces(merge_point, scope, &excluded)?);

        for name in candidates {
            if seen.insert(name.clone()) {
                result.push(name);
            }
        }

        tracing::event!(
            name: "weld.merge.resolved",
            tracing::Level::DEBUG,
            weld.merge_point = %merge_point,
            weld.scope = %scope,
            weld.merged = result.len(),
            weld.replaced = replaced.len(),
            weld.excluded = excluded.len(),
        );

        Ok(result)
    }

    /// Computes the DI modules, bindings and multibindings merged into `merge_point`.
    ///
    /// Replacement targets only need to share the scope; unlike interface merging they are not
    /// required to be interfaces.
    ///
    /// # Errors
    ///
    /// Fails for invalid replacements or exclusions, and if an explicitly listed module cannot be
    /// resolved.
    pub fn resolve_modules(&self, merge_point: &Declaration, merge: &MergeAnnotation) -> Result<MergedModules> {
        let scope = merge.scope();

        let mut explicit = Vec::new();
        for module in merge.modules() {
            explicit.push(self.symbols.require(module, merge_point)?.fq_name());
        }

        let mut contributed_modules = Vec::new();
        for contribution in self.index.find_contributed(Some(scope), ContributionKind::To) {
            let declaration = self.declaration_of(contribution)?;
            if declaration.is_module() {
                contributed_modules.push((declaration, contribution));
            }
        }

        let bindings = self.contributed_of_kind(scope, ContributionKind::Binding)?;
        let multibindings = self.contributed_of_kind(scope, ContributionKind::Multibinding)?;

        let all = contributed_modules.iter().chain(&bindings).chain(&multibindings).map(|(d, c)| (*d, *c));
        let replaced = self.replaced(all, scope, false)?;
        let excluded = self.excluded(merge_point, merge)?;

        let keep = |list: &[(&Declaration, &Contribution)]| -> Vec<FqName> {
            list.iter()
                .map(|(declaration, _)| declaration.fq_name())
                .filter(|name| !replaced.contains(name) && !excluded.contains(name))
                .collect()
        };

        let mut modules = explicit;
        for module in keep(&contributed_modules) {
            if !modules.contains(&module) {
                modules.push(module);
            }
        }

        Ok(MergedModules {
            modules,
            bindings: keep(&bindings),
            multibindings: keep(&multibindings),
        })
    }

    /// Validates the `exclude` list of `merge_point` and returns the excluded names.
    ///
    /// Each excluded declaration must be contributed to the merged scope with any contribution kind;
    /// a contributed subcomponent counts as contributed to its parent scope.
    ///
    /// # Errors
    ///
    /// Returns a resolution error if an excluded declaration cannot be resolved or is not
    /// contributed at all, and a scope mismatch error if it is contributed to another scope.
    pub fn excluded(&self, merge_point: &Declaration, merge: &MergeAnnotation) -> Result<HashSet<FqName>> {
        let scope = merge.scope();
        let mut excluded = HashSet::new();

        for name in merge.exclude() {
            let declaration = self.symbols.require(name, merge_point)?;
            let scopes = self.symbols.contribution_scopes(declaration, &ContributionKind::ALL);

            if scopes.is_empty() {
                return Err(Error::at(
                    ErrorKind::Resolution,
                    merge_point,
                    format!("Could not determine the scope of the excluded class {declaration}."),
                ));
            }

            if !scopes.contains(scope) {
                return Err(Error::at(
                    ErrorKind::ScopeMismatch,
                    merge_point,
                    format!(
                        "{merge_point} with scope {scope} wants to exclude {declaration} with scope {}. The exclusion \
                         must use the same scope.",
                        join(&scopes)
                    ),
                ));
            }

            excluded.insert(declaration.fq_name());
        }

        Ok(excluded)
    }

    fn replaced<'c>(
        &self,
        contributions: impl Iterator<Item = (&'c Declaration, &'c Contribution)>,
        scope: &FqName,
        require_interface: bool,
    ) -> Result<HashSet<FqName>> {
        let mut replaced = HashSet::new();

        for (replacer, contribution) in contributions {
            for name in contribution.replaces() {
                let target = self.symbols.require(name, replacer)?;

                if require_interface && !target.is_interface() {
                    return Err(Error::at(
                        ErrorKind::Type,
                        replacer,
                        format!(
                            "{replacer} wants to replace {target}, but the class being replaced is not an interface."
                        ),
                    ));
                }

                let scopes = self.symbols.contribution_scopes(target, &ContributionKind::REPLACEABLE);
                if scopes.is_empty() {
                    return Err(Error::at(
                        ErrorKind::Resolution,
                        replacer,
                        format!("Could not determine the scope of the replaced class {target}."),
                    ));
                }

                if !scopes.contains(scope) {
                    return Err(Error::at(
                        ErrorKind::ScopeMismatch,
                        replacer,
                        format!(
                            "{replacer} with scope {scope} wants to replace {target} with scope {}. The replacement \
                             must use the same scope.",
                            join(&scopes)
                        ),
                    ));
                }

                replaced.insert(target.fq_name());
            }
        }

        Ok(replaced)
    }

    fn subcomponent_parent_interfaces(
        &self,
        merge_point: &Declaration,
        scope: &FqName,
        excluded: &HashSet<FqName>,
    ) -> Result<Vec<FqName>> {
        let mut interfaces = Vec::new();

        for contribution in self
            .index
            .find_contributed(None, ContributionKind::Subcomponent)
            .filter(|c| c.parent_scope() == Some(scope) && !excluded.contains(c.declaration()))
        {
            let subcomponent = self.declaration_of(contribution)?;
            let accessor = naming::parent_component(merge_point.id(), subcomponent.id()).fq_name();

            if self.symbols.find(&accessor).is_some() {
                interfaces.push(accessor);
            }
        }

        Ok(interfaces)
    }

    fn contributed_of_kind(
        &self,
        scope: &FqName,
        kind: ContributionKind,
    ) -> Result<Vec<(&'a Declaration, &'a Contribution)>> {
        self.index
            .find_contributed(Some(scope), kind)
            .map(|contribution| Ok((self.declaration_of(contribution)?, contribution)))
            .collect()
    }

    fn declaration_of(&self, contribution: &Contribution) -> Result<&'a Declaration> {
        self.symbols.find(contribution.declaration()).ok_or_else(|| {
            Error::new(
                ErrorKind::Resolution,
                format!("Unable to resolve the contributed declaration {}.", contribution.declaration()),
            )
        })
    }
}

fn join(names: &[FqName]) -> String {
    names.iter().map(FqName::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::index::Round;
    use crate::markers::InMemoryMarkerStore;
    use crate::program::Program;
    use crate::scanner::ClassScanner;
    use crate::symbols::{Annotation, MergeArguments, Visibility};

    fn scopes() -> Vec<Declaration> {
        ["kotlin.Unit", "kotlin.Any", "kotlin.Int"]
            .into_iter()
            .map(|name| Declaration::class(name).build())
            .collect()
    }

    fn contributes_to(scope: &str, replaces: &[&str]) -> Annotation {
        Annotation::ContributesTo {
            scope: FqName::new(scope),
            replaces: replaces.iter().copied().map(FqName::new).collect(),
        }
    }

    fn component(arguments: MergeArguments) -> Declaration {
        Declaration::interface("com.squareup.test.ComponentInterface")
            .annotate(Annotation::MergeComponent(arguments))
            .build()
    }

    fn resolve(mut sources: Vec<Declaration>) -> Result<Vec<String>> {
        sources.extend(scopes());
        let program = Program::from_sources(sources)?;
        let symbols = Symbols::new(&program);

        let mut index = ContributionIndex::new();
        ClassScanner::new().refresh(&symbols, &mut InMemoryMarkerStore::new(), &mut index, Round::FIRST)?;

        let merge_point = symbols.find(&FqName::new("com.squareup.test.ComponentInterface")).unwrap();
        let merge = symbols.merge_annotation(merge_point)?.unwrap();
        let mut names: Vec<String> = ContributionResolver::new(symbols, &index)
            .resolve_for_merge(merge_point, &merge)?
            .iter()
            .map(ToString::to_string)
            .collect();
        names.sort();

        Ok(names)
    }

    #[test]
    fn single_contribution() {
        let result = resolve(vec![
            component(MergeArguments::new("kotlin.Unit")),
            Declaration::interface("com.squareup.test.Foo").contributes_to("kotlin.Unit").build(),
            Declaration::interface("com.squareup.test.Other").contributes_to("kotlin.Any").build(),
        ])
        .unwrap();

        assert_eq!(result, ["com.squareup.test.Foo"]);
    }

    #[test]
    fn modules_and_classes_are_not_merged_as_interfaces() {
        let result = resolve(vec![
            component(MergeArguments::new("kotlin.Unit")),
            Declaration::interface("com.squareup.test.Foo").contributes_to("kotlin.Unit").build(),
            Declaration::abstract_class("com.squareup.test.DaggerModule")
                .annotate(Annotation::Module)
                .contributes_to("kotlin.Unit")
                .build(),
            Declaration::interface("com.squareup.test.InterfaceModule")
                .annotate(Annotation::Module)
                .contributes_to("kotlin.Unit")
                .build(),
        ])
        .unwrap();

        assert_eq!(result, ["com.squareup.test.Foo"]);
    }

    #[test]
    fn replaced_interface_is_dropped() {
        let result = resolve(vec![
            component(MergeArguments::new("kotlin.Unit")),
            Declaration::interface("com.squareup.test.Foo").contributes_to("kotlin.Unit").build(),
            Declaration::interface("com.squareup.test.Bar")
                .annotate(contributes_to("kotlin.Unit", &["com.squareup.test.Foo"]))
                .build(),
        ])
        .unwrap();

        assert_eq!(result, ["com.squareup.test.Bar"]);
    }

    #[test]
    fn replacing_a_class_is_a_type_error() {
        let error = resolve(vec![
            component(MergeArguments::new("kotlin.Unit")),
            Declaration::class("com.squareup.test.Foo").contributes_to("kotlin.Unit").build(),
            Declaration::interface("com.squareup.test.Bar")
                .annotate(contributes_to("kotlin.Unit", &["com.squareup.test.Foo"]))
                .build(),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Type);
        insta::assert_snapshot!(
            error.message(),
            @"com.squareup.test.Bar wants to replace com.squareup.test.Foo, but the class being replaced is not an interface."
        );
    }

    #[test]
    fn replacing_with_a_different_scope() {
        let error = resolve(vec![
            component(MergeArguments::new("kotlin.Unit")),
            Declaration::interface("com.squareup.test.Foo").contributes_to("kotlin.Int").build(),
            Declaration::interface("com.squareup.test.Bar")
                .annotate(contributes_to("kotlin.Unit", &["com.squareup.test.Foo"]))
                .build(),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::ScopeMismatch);
        insta::assert_snapshot!(
            error.message(),
            @"com.squareup.test.Bar with scope kotlin.Unit wants to replace com.squareup.test.Foo with scope kotlin.Int. The replacement must use the same scope."
        );
    }

    #[test]
    fn replacing_an_uncontributed_interface() {
        let error = resolve(vec![
            component(MergeArguments::new("kotlin.Unit")),
            Declaration::interface("com.squareup.test.Foo").build(),
            Declaration::interface("com.squareup.test.Bar")
                .annotate(contributes_to("kotlin.Unit", &["com.squareup.test.Foo"]))
                .build(),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn excluded_interface_is_dropped() {
        let result = resolve(vec![
            component(MergeArguments::new("kotlin.Unit").exclude("com.squareup.test.Foo")),
            Declaration::interface("com.squareup.test.Foo").contributes_to("kotlin.Unit").build(),
            Declaration::interface("com.squareup.test.Bar").contributes_to("kotlin.Unit").build(),
        ])
        .unwrap();

        assert_eq!(result, ["com.squareup.test.Bar"]);
    }

    #[test]
    fn excluding_with_a_different_scope() {
        let error = resolve(vec![
            component(MergeArguments::new("kotlin.Unit").exclude("com.squareup.test.Foo")),
            Declaration::interface("com.squareup.test.Foo").contributes_to("kotlin.Int").build(),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::ScopeMismatch);
        insta::assert_snapshot!(
            error.message(),
            @"com.squareup.test.ComponentInterface with scope kotlin.Unit wants to exclude com.squareup.test.Foo with scope kotlin.Int. The exclusion must use the same scope."
        );
    }

    #[test]
    fn excluding_a_class_that_is_not_contributed() {
        let error = resolve(vec![
            component(MergeArguments::new("kotlin.Unit").exclude("com.squareup.test.Foo")),
            Declaration::interface("com.squareup.test.Foo").build(),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Resolution);
        insta::assert_snapshot!(
            error.message(),
            @"Could not determine the scope of the excluded class com.squareup.test.Foo."
        );
    }

    #[test]
    fn excluding_an_inherited_interface() {
        let error = resolve(vec![
            Declaration::interface("com.squareup.test.ComponentInterface")
                .annotate(Annotation::MergeComponent(
                    MergeArguments::new("kotlin.Unit").exclude("com.squareup.test.Foo"),
                ))
                .extends("com.squareup.test.Middle")
                .build(),
            Declaration::interface("com.squareup.test.Middle").extends("com.squareup.test.Foo").build(),
            Declaration::interface("com.squareup.test.Foo").contributes_to("kotlin.Unit").build(),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvariantViolation);
        insta::assert_snapshot!(
            error.message(),
            @"ComponentInterface excludes types that it implements or extends. These types cannot be excluded. Look at all the super types to find these classes: com.squareup.test.Foo"
        );
    }

    #[test]
    fn contributed_interface_must_be_public() {
        let error = resolve(vec![
            component(MergeArguments::new("kotlin.Unit")),
            Declaration::interface("com.squareup.test.Foo")
                .contributes_to("kotlin.Unit")
                .visibility(Visibility::Internal)
                .build(),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Visibility);
        assert_eq!(error.declaration().map(FqName::as_str), Some("com.squareup.test.Foo"));
    }

    #[test]
    fn modules_and_bindings() {
        let sources = vec![
            component(
                MergeArguments::new("kotlin.Unit")
                    .module("com.squareup.test.ManualModule")
                    .exclude("com.squareup.test.ExcludedBinding"),
            ),
            Declaration::object("com.squareup.test.ManualModule").annotate(Annotation::Module).build(),
            Declaration::object("com.squareup.test.DaggerModule1")
                .annotate(Annotation::Module)
                .contributes_to("kotlin.Unit")
                .build(),
            Declaration::object("com.squareup.test.DaggerModule2")
                .annotate(Annotation::Module)
                .annotate(contributes_to("kotlin.Unit", &["com.squareup.test.DaggerModule1"]))
                .build(),
            Declaration::class("com.squareup.test.Binding")
                .annotate(Annotation::ContributesBinding {
                    scope: FqName::new("kotlin.Unit"),
                    replaces: Vec::new(),
                    bound_type: None,
                })
                .build(),
            Declaration::class("com.squareup.test.ExcludedBinding")
                .annotate(Annotation::ContributesBinding {
                    scope: FqName::new("kotlin.Unit"),
                    replaces: Vec::new(),
                    bound_type: None,
                })
                .build(),
            Declaration::class("com.squareup.test.Plugin")
                .annotate(Annotation::ContributesMultibinding {
                    scope: FqName::new("kotlin.Unit"),
                    replaces: Vec::new(),
                    bound_type: None,
                })
                .build(),
        ]
        .into_iter()
        .chain(scopes())
        .collect();

        let program = Program::from_sources(sources).unwrap();
        let symbols = Symbols::new(&program);
        let mut index = ContributionIndex::new();
        ClassScanner::new()
            .refresh(&symbols, &mut InMemoryMarkerStore::new(), &mut index, Round::FIRST)
            .unwrap();

        let merge_point = symbols.find(&FqName::new("com.squareup.test.ComponentInterface")).unwrap();
        let merge = symbols.merge_annotation(merge_point).unwrap().unwrap();
        let merged = ContributionResolver::new(symbols, &index)
            .resolve_modules(merge_point, &merge)
            .unwrap();

        assert_eq!(
            merged,
            MergedModules {
                modules: vec![
                    FqName::new("com.squareup.test.ManualModule"),
                    FqName::new("com.squareup.test.DaggerModule2"),
                ],
                bindings: vec![FqName::new("com.squareup.test.Binding")],
                multibindings: vec![FqName::new("com.squareup.test.Plugin")],
            }
        );
    }
}

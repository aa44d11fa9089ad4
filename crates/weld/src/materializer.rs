// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::contribution::{Contribution, ContributionDetails, ContributionKind};
use crate::emit::{CodeEmitter, TypeSpec};
use crate::index::{ContributionIndex, Round};
use crate::names::{ClassId, FqName};
use crate::naming;
use crate::resolver::ContributionResolver;
use crate::symbols::{Annotation, Declaration, FunctionSig, MergeAnnotation, MergeArguments, Symbols};
use crate::{Error, ErrorKind, Result};

/// A subcomponent generated, or found already generated, for one (subcomponent, parent) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubcomponentRecord {
    subcomponent: FqName,
    parent: FqName,
    component: ClassId,
    parent_component: ClassId,
    #[serde(skip_serializing_if = "Option::is_none")]
    factory: Option<ClassId>,
    round: Round,
    reused: bool,
}

impl SubcomponentRecord {
    /// The contributed subcomponent.
    #[must_use]
    pub fn subcomponent(&self) -> &FqName {
        &self.subcomponent
    }

    /// The merge point the subcomponent was added to.
    #[must_use]
    pub fn parent(&self) -> &FqName {
        &self.parent
    }

    /// The generated component.
    #[must_use]
    pub fn component(&self) -> &ClassId {
        &self.component
    }

    /// The parent accessor interface nested in the generated component.
    #[must_use]
    pub fn parent_component(&self) -> &ClassId {
        &self.parent_component
    }

    /// The generated factory, if the subcomponent declares a factory abstraction.
    #[must_use]
    pub fn factory(&self) -> Option<&ClassId> {
        self.factory.as_ref()
    }

    /// The round the record was created in.
    #[must_use]
    pub fn round(&self) -> Round {
        self.round
    }

    /// Whether the generated component already existed, e.g. from an earlier compilation.
    #[must_use]
    pub fn is_reused(&self) -> bool {
        self.reused
    }
}

/// Generates a nested component for every contributed subcomponent under every matching merge
/// point, one round at a time.
///
/// A component generated in round `N` is itself a merge point from round `N + 1` on, which is
/// what makes materialization span several rounds.
#[derive(Debug, Default)]
pub struct SubcomponentMaterializer {
    records: BTreeMap<(FqName, FqName), SubcomponentRecord>,
    generated: HashMap<FqName, FqName>,
}

impl SubcomponentMaterializer {
    /// Creates a materializer without any records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, ordered by (subcomponent, parent).
    pub fn records(&self) -> impl Iterator<Item = &SubcomponentRecord> {
        self.records.values()
    }

    /// The record for `subcomponent` under `parent`, if there is one.
    #[must_use]
    pub fn record(&self, subcomponent: &FqName, parent: &FqName) -> Option<&SubcomponentRecord> {
        self.records.get(&(subcomponent.clone(), parent.clone()))
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record exists yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Runs one round over every merge point visible in `symbols`.
    ///
    /// Returns the number of subcomponents emitted. Records for components that already exist are
    /// created without emitting anything and do not count.
    ///
    /// # Errors
    ///
    /// Fails for invalid exclusions of a merge point, if two subcomponents would generate the same
    /// component, or if a subcomponent nests more than one factory or parent accessor interface.
    pub fn materialize_round(
        &mut self,
        symbols: &Symbols<'_>,
        index: &ContributionIndex,
        round: Round,
        emitter: &mut dyn CodeEmitter,
    ) -> Result<usize> {
        let resolver = ContributionResolver::new(*symbols, index);

        let mut merge_points = Vec::new();
        for declaration in symbols.source_declarations() {
            if let Some(merge) = symbols.merge_annotation(declaration)?
                && merge.kind().merges_interfaces()
            {
                merge_points.push((declaration, merge));
            }
        }
        merge_points.sort_by(|(a, _), (b, _)| a.id().cmp(b.id()));

        let candidates = index.find_contributed(None, ContributionKind::Subcomponent);
        let mut emitted = 0;

        for (owner, merge) in merge_points {
            let excluded = resolver.excluded(owner, &merge)?;

            for contribution in candidates
                .clone()
                .filter(|c| c.parent_scope() == Some(merge.scope()) && !excluded.contains(c.declaration()))
            {
                let key = (contribution.declaration().clone(), owner.fq_name());
                if self.records.contains_key(&key) {
                    continue;
                }

                let subcomponent = symbols.find(contribution.declaration()).ok_or_else(|| {
                    Error::new(
                        ErrorKind::Resolution,
                        format!("Unable to resolve the contributed subcomponent {}.", contribution.declaration()),
                    )
                })?;

                let component = naming::generated_subcomponent(owner.id(), subcomponent.id());
                self.claim(&component, subcomponent, owner)?;

                let record = if symbols.find(&component.fq_name()).is_some() {
                    tracing::event!(
                        name: "weld.subcomponent.reused",
                        tracing::Level::DEBUG,
                        weld.round = round.number(),
                        weld.subcomponent = %subcomponent,
                        weld.parent = %owner,
                        weld.component = %component.fq_name(),
                    );

                    let factory = factory_of(symbols, subcomponent)?
                        .map(|_| naming::subcomponent_factory(owner.id(), subcomponent.id()));
                    new_record(subcomponent, owner, component, factory, round, true)
                } else {
                    let (spec, factory) =
                        subcomponent_spec(symbols, owner, &merge, subcomponent, contribution, &component)?;
                    emitter.emit(spec)?;
                    emitted += 1;

                    tracing::event!(
                        name: "weld.subcomponent.generated",
                        tracing::Level::INFO,
                        weld.round = round.number(),
                        weld.subcomponent = %subcomponent,
                        weld.parent = %owner,
                        weld.component = %component.fq_name(),
                    );

                    new_record(subcomponent, owner, component, factory, round, false)
                };

                self.records.insert(key, record);
            }
        }

        Ok(emitted)
    }

    fn claim(&mut self, component: &ClassId, subcomponent: &Declaration, owner: &Declaration) -> Result<()> {
        let name = component.fq_name();
        match self.generated.get(&name) {
            Some(existing) if *existing != subcomponent.fq_name() => Err(Error::at(
                ErrorKind::InvariantViolation,
                subcomponent,
                format!(
                    "{subcomponent} and {existing} are both contributed to {owner} and would generate the same \
                     component {name}. Contributed subcomponents merged into one component need distinct names."
                ),
            )),
            Some(_) => Ok(()),
            None => {
                self.generated.insert(name, subcomponent.fq_name());
                Ok(())
            }
        }
    }
}

fn new_record(
    subcomponent: &Declaration,
    owner: &Declaration,
    component: ClassId,
    factory: Option<ClassId>,
    round: Round,
    reused: bool,
) -> SubcomponentRecord {
    SubcomponentRecord {
        subcomponent: subcomponent.fq_name(),
        parent: owner.fq_name(),
        parent_component: component.nested(naming::PARENT_COMPONENT),
        component,
        factory,
        round,
        reused,
    }
}

fn factory_of<'a>(symbols: &Symbols<'a>, subcomponent: &Declaration) -> Result<Option<&'a Declaration>> {
    let factories: Vec<&Declaration> = symbols
        .nested(subcomponent)
        .into_iter()
        .filter(|d| d.annotations().contains(&Annotation::SubcomponentFactory))
        .collect();

    match factories.as_slice() {
        [] => Ok(None),
        [factory] => Ok(Some(*factory)),
        _ => Err(Error::at(
            ErrorKind::InvariantViolation,
            subcomponent,
            format!("Expected zero or one factory within {subcomponent}."),
        )),
    }
}

fn user_parent_component<'a>(
    symbols: &Symbols<'a>,
    subcomponent: &Declaration,
    parent_scope: &FqName,
) -> Result<Option<&'a Declaration>> {
    let interfaces: Vec<&Declaration> = symbols
        .nested(subcomponent)
        .into_iter()
        .filter(|d| {
            d.is_interface()
                && symbols
                    .contribution_scopes(d, &[ContributionKind::To])
                    .contains(parent_scope)
        })
        .collect();

    match interfaces.as_slice() {
        [] => Ok(None),
        [interface] => Ok(Some(*interface)),
        _ => Err(Error::at(
            ErrorKind::InvariantViolation,
            subcomponent,
            format!("Expected zero or one parent component interface within {subcomponent}."),
        )),
    }
}

fn subcomponent_spec(
    symbols: &Symbols<'_>,
    owner: &Declaration,
    merge: &MergeAnnotation,
    subcomponent: &Declaration,
    contribution: &Contribution,
    component: &ClassId,
) -> Result<(TypeSpec, Option<ClassId>)> {
    let (modules, exclude) = match contribution.details() {
        ContributionDetails::Subcomponent { modules, exclude, .. } => (modules.clone(), exclude.clone()),
        _ => (Vec::new(), Vec::new()),
    };

    let user_factory = factory_of(symbols, subcomponent)?;
    let factory = user_factory.map(|_| naming::subcomponent_factory(owner.id(), subcomponent.id()));
    let created = factory.as_ref().map_or_else(|| component.fq_name(), ClassId::fq_name);

    let mut spec = TypeSpec::interface(component.clone())
        .annotation(Annotation::MergeSubcomponent(MergeArguments {
            scope: contribution.scope().clone(),
            modules,
            exclude,
        }))
        .supertype(subcomponent.fq_name());

    for scope_annotation in symbols.scope_annotations(subcomponent) {
        spec = spec.annotation(Annotation::Scoped(scope_annotation));
    }

    spec = spec.nest(parent_component_spec(symbols, subcomponent, merge.scope(), component, user_factory, &created)?);

    if let (Some(user_factory), Some(factory)) = (user_factory, &factory) {
        spec = spec.nest(TypeSpec::new(user_factory.kind(), factory.clone()).supertype(user_factory.fq_name()));
    }

    Ok((spec, factory))
}

fn parent_component_spec(
    symbols: &Symbols<'_>,
    subcomponent: &Declaration,
    parent_scope: &FqName,
    component: &ClassId,
    user_factory: Option<&Declaration>,
    created: &FqName,
) -> Result<TypeSpec> {
    let accessor = TypeSpec::interface(component.nested(naming::PARENT_COMPONENT));
    let default_name = if user_factory.is_some() {
        "createComponentFactory"
    } else {
        "createComponent"
    };

    let Some(user) = user_parent_component(symbols, subcomponent, parent_scope)? else {
        return Ok(accessor.function(FunctionSig::new(default_name, created.as_str())));
    };

    let subcomponent_name = subcomponent.fq_name();
    let factory_name = user_factory.map(Declaration::fq_name);
    let creators: Vec<&FunctionSig> = user
        .functions()
        .iter()
        .filter(|f| {
            f.returns == subcomponent_name.as_str() || factory_name.as_ref().is_some_and(|n| f.returns == n.as_str())
        })
        .collect();

    let accessor = accessor.supertype(user.fq_name());

    match creators.as_slice() {
        [] => Ok(accessor.function(FunctionSig::new(default_name, created.as_str()))),
        [creator] => Ok(accessor.function(FunctionSig::new(creator.name.clone(), created.as_str()).overriding())),
        _ => Err(Error::at(
            ErrorKind::InvariantViolation,
            user,
            format!("Expected zero or one function returning the subcomponent {subcomponent_name}."),
        )),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::emit::EmittedTypes;
    use crate::markers::InMemoryMarkerStore;
    use crate::program::Program;
    use crate::scanner::ClassScanner;

    fn contributes_subcomponent(scope: &str, parent_scope: &str) -> Annotation {
        Annotation::ContributesSubcomponent {
            scope: FqName::new(scope),
            parent_scope: FqName::new(parent_scope),
            modules: Vec::new(),
            exclude: Vec::new(),
        }
    }

    fn run_round(sources: Vec<Declaration>) -> Result<(SubcomponentMaterializer, Vec<TypeSpec>)> {
        let mut declarations = vec![
            Declaration::class("kotlin.Unit").build(),
            Declaration::class("kotlin.Any").build(),
            Declaration::class("kotlin.Int").build(),
        ];
        declarations.extend(sources);
        let program = Program::from_sources(declarations)?;
        let symbols = Symbols::new(&program);

        let mut index = ContributionIndex::new();
        ClassScanner::new().refresh(&symbols, &mut InMemoryMarkerStore::new(), &mut index, Round::FIRST)?;

        let mut materializer = SubcomponentMaterializer::new();
        let mut emitted = EmittedTypes::new(Round::FIRST);
        materializer.materialize_round(&symbols, &index, Round::FIRST, &mut emitted)?;

        Ok((materializer, emitted.into_specs()))
    }

    #[test]
    fn generates_component_with_parent_accessor() {
        let (materializer, specs) = run_round(vec![
            Declaration::interface("com.squareup.test.SubcomponentInterface")
                .annotate(contributes_subcomponent("kotlin.Any", "kotlin.Unit"))
                .annotate(Annotation::Scoped(FqName::new("javax.inject.Singleton")))
                .build(),
            Declaration::interface("com.squareup.test.ComponentInterface")
                .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
                .build(),
        ])
        .unwrap();

        assert_eq!(materializer.len(), 1);
        let spec = &specs[0];

        assert_eq!(
            spec.id().fq_name().as_str(),
            "weld.component.com.squareup.test.ComponentInterface.SubcomponentInterfaceA"
        );
        assert_eq!(spec.supertypes(), [FqName::new("com.squareup.test.SubcomponentInterface")]);
        assert_eq!(
            spec.annotations(),
            [
                Annotation::MergeSubcomponent(MergeArguments::new("kotlin.Any")),
                Annotation::Scoped(FqName::new("javax.inject.Singleton")),
            ]
        );

        let accessor = &spec.nested()[0];
        assert_eq!(accessor.id().simple_name(), "ParentComponent");
        assert_eq!(accessor.functions()[0].name, "createComponent");
        assert_eq!(accessor.functions()[0].returns, spec.id().fq_name().as_str());
    }

    #[test]
    fn merge_modules_and_other_scopes_get_nothing() {
        let (materializer, specs) = run_round(vec![
            Declaration::interface("com.squareup.test.SubcomponentInterface")
                .annotate(contributes_subcomponent("kotlin.Any", "kotlin.Unit"))
                .build(),
            Declaration::abstract_class("com.squareup.test.DaggerModule")
                .annotate(Annotation::MergeModules(MergeArguments::new("kotlin.Unit")))
                .build(),
            Declaration::interface("com.squareup.test.ComponentInterface")
                .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Int")))
                .build(),
        ])
        .unwrap();

        assert!(materializer.is_empty());
        assert!(specs.is_empty());
    }

    #[test]
    fn excluded_subcomponent_is_skipped() {
        let (materializer, _) = run_round(vec![
            Declaration::interface("com.squareup.test.SubcomponentInterface")
                .annotate(contributes_subcomponent("kotlin.Any", "kotlin.Unit"))
                .build(),
            Declaration::interface("com.squareup.test.ComponentInterface")
                .annotate(Annotation::MergeComponent(
                    MergeArguments::new("kotlin.Unit").exclude("com.squareup.test.SubcomponentInterface"),
                ))
                .build(),
            Declaration::interface("com.squareup.test.ContributingInterface")
                .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
                .build(),
        ])
        .unwrap();

        assert_eq!(materializer.len(), 1);
        assert!(
            materializer
                .record(
                    &FqName::new("com.squareup.test.SubcomponentInterface"),
                    &FqName::new("com.squareup.test.ContributingInterface"),
                )
                .is_some()
        );
    }

    #[test]
    fn excluding_subcomponent_with_other_parent_scope() {
        let error = run_round(vec![
            Declaration::interface("com.squareup.test.SubcomponentInterface")
                .annotate(contributes_subcomponent("kotlin.Unit", "kotlin.Int"))
                .build(),
            Declaration::interface("com.squareup.test.ComponentInterface")
                .annotate(Annotation::MergeComponent(
                    MergeArguments::new("kotlin.Any").exclude("com.squareup.test.SubcomponentInterface"),
                ))
                .build(),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::ScopeMismatch);
    }

    #[test]
    fn accessor_extends_user_interface_and_returns_factory() {
        let (materializer, specs) = run_round(vec![
            Declaration::interface("com.squareup.test.SubcomponentInterface")
                .annotate(contributes_subcomponent("kotlin.Any", "kotlin.Unit"))
                .build(),
            Declaration::interface("com.squareup.test.SubcomponentInterface.AnyParentComponent")
                .contributes_to("kotlin.Unit")
                .function(FunctionSig::new(
                    "createFactory",
                    "com.squareup.test.SubcomponentInterface.ComponentFactory",
                ))
                .build(),
            Declaration::abstract_class("com.squareup.test.SubcomponentInterface.ComponentFactory")
                .annotate(Annotation::SubcomponentFactory)
                .function(FunctionSig::new("createComponent", "com.squareup.test.SubcomponentInterface"))
                .build(),
            Declaration::interface("com.squareup.test.ComponentInterface")
                .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
                .build(),
        ])
        .unwrap();

        let record = materializer.records().next().unwrap();
        let factory = record.factory().unwrap();
        let spec = &specs[0];
        let accessor = &spec.nested()[0];
        let generated_factory = &spec.nested()[1];

        assert_eq!(
            accessor.supertypes(),
            [FqName::new("com.squareup.test.SubcomponentInterface.AnyParentComponent")]
        );
        assert_eq!(
            accessor.functions(),
            [FunctionSig::new("createFactory", factory.fq_name().as_str()).overriding()]
        );
        assert_eq!(generated_factory.id(), factory);
        assert_eq!(
            generated_factory.supertypes(),
            [FqName::new("com.squareup.test.SubcomponentInterface.ComponentFactory")]
        );
    }

    #[test]
    fn default_factory_accessor() {
        let (_, specs) = run_round(vec![
            Declaration::interface("com.squareup.test.SubcomponentInterface")
                .annotate(contributes_subcomponent("kotlin.Any", "kotlin.Unit"))
                .build(),
            Declaration::interface("com.squareup.test.SubcomponentInterface.ComponentFactory")
                .annotate(Annotation::SubcomponentFactory)
                .build(),
            Declaration::interface("com.squareup.test.ComponentInterface")
                .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
                .build(),
        ])
        .unwrap();

        assert_eq!(specs[0].nested()[0].functions()[0].name, "createComponentFactory");
    }

    #[test]
    fn two_factories() {
        let error = run_round(vec![
            Declaration::interface("com.squareup.test.SubcomponentInterface")
                .annotate(contributes_subcomponent("kotlin.Any", "kotlin.Unit"))
                .build(),
            Declaration::interface("com.squareup.test.SubcomponentInterface.Factory1")
                .annotate(Annotation::SubcomponentFactory)
                .build(),
            Declaration::interface("com.squareup.test.SubcomponentInterface.Factory2")
                .annotate(Annotation::SubcomponentFactory)
                .build(),
            Declaration::interface("com.squareup.test.ComponentInterface")
                .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
                .build(),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvariantViolation);
    }

    #[test]
    fn same_local_name_in_different_packages() {
        let error = run_round(vec![
            Declaration::interface("com.squareup.a.SubcomponentInterface")
                .annotate(contributes_subcomponent("kotlin.Any", "kotlin.Unit"))
                .build(),
            Declaration::interface("com.squareup.b.SubcomponentInterface")
                .annotate(contributes_subcomponent("kotlin.Any", "kotlin.Unit"))
                .build(),
            Declaration::interface("com.squareup.test.ComponentInterface")
                .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
                .build(),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvariantViolation);
        assert_eq!(error.declaration().map(FqName::as_str), Some("com.squareup.b.SubcomponentInterface"));
    }
}

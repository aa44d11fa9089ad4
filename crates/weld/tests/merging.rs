// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Merging contributed interfaces, modules and bindings into merge points.

use pretty_assertions::assert_eq;
use rstest::rstest;
use tracing_test::traced_test;
use weld::names::FqName;
use weld::symbols::{Annotation, Declaration, MergeArguments, Parameter, SemanticModel, SourcePosition};
use weld::{Compilation, CompilationReport, ErrorKind, Program, Result, WeldOptions};

const COMPONENT: &str = "com.squareup.test.ComponentInterface";

fn scopes() -> Vec<Declaration> {
    ["kotlin.Unit", "kotlin.Any"]
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

fn run(sources: Vec<Declaration>, options: WeldOptions) -> Result<CompilationReport> {
    let program = Program::from_sources(sources.into_iter().chain(scopes()).collect())?;
    Compilation::new(program).with_options(options).run()
}

fn merged(report: &CompilationReport) -> Vec<&str> {
    report.merged_supertypes[&FqName::new(COMPONENT)]
        .iter()
        .map(FqName::as_str)
        .collect()
}

#[rstest]
#[case::merge_component(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))]
#[case::merge_subcomponent(Annotation::MergeSubcomponent(MergeArguments::new("kotlin.Unit")))]
#[case::merge_interfaces(Annotation::MergeInterfaces(MergeArguments::new("kotlin.Unit")))]
fn contributed_interfaces_are_merged(#[case] merge: Annotation) {
    let report = run(
        vec![
            Declaration::interface(COMPONENT).annotate(merge).build(),
            Declaration::interface("com.squareup.test.ContributingInterface")
                .contributes_to("kotlin.Unit")
                .build(),
            Declaration::interface("com.squareup.test.SecondContributingInterface")
                .contributes_to("kotlin.Unit")
                .build(),
            Declaration::interface("com.squareup.test.OtherScope")
                .contributes_to("kotlin.Any")
                .build(),
        ],
        WeldOptions::default(),
    )
    .unwrap();

    assert_eq!(
        merged(&report),
        [
            "com.squareup.test.ContributingInterface",
            "com.squareup.test.SecondContributingInterface",
        ]
    );
}

#[test]
fn replacement_and_exclusion() {
    let report = run(
        vec![
            Declaration::interface(COMPONENT)
                .annotate(Annotation::MergeComponent(
                    MergeArguments::new("kotlin.Unit").exclude("com.squareup.test.Excluded"),
                ))
                .build(),
            Declaration::interface("com.squareup.test.Replaced")
                .contributes_to("kotlin.Unit")
                .build(),
            Declaration::interface("com.squareup.test.Replacement")
                .annotate(contributes_to("kotlin.Unit", &["com.squareup.test.Replaced"]))
                .build(),
            Declaration::interface("com.squareup.test.Excluded")
                .contributes_to("kotlin.Unit")
                .build(),
        ],
        WeldOptions::default(),
    )
    .unwrap();

    assert_eq!(merged(&report), ["com.squareup.test.Replacement"]);
}

#[test]
fn excluding_a_direct_supertype() {
    let error = run(
        vec![
            Declaration::interface(COMPONENT)
                .annotate(Annotation::MergeComponent(
                    MergeArguments::new("kotlin.Unit").exclude("com.squareup.test.ContributingInterface"),
                ))
                .extends("com.squareup.test.ContributingInterface")
                .at(SourcePosition::new("Source0.kt", 8, 1))
                .build(),
            Declaration::interface("com.squareup.test.ContributingInterface")
                .contributes_to("kotlin.Unit")
                .build(),
        ],
        WeldOptions::default(),
    )
    .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::InvariantViolation);
    insta::assert_snapshot!(
        error,
        @"Source0.kt: (8, 1): ComponentInterface excludes types that it implements or extends. These types cannot be excluded. Look at all the super types to find these classes: com.squareup.test.ContributingInterface"
    );
}

#[test]
fn inner_class_contributed_to_outer_class() {
    let error = run(
        vec![
            Declaration::interface(COMPONENT)
                .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
                .build(),
            Declaration::interface("com.squareup.test.ComponentInterface.InnerInterface")
                .contributes_to(COMPONENT)
                .build(),
        ],
        WeldOptions::default(),
    )
    .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Structural);
}

#[test]
fn modules_and_bindings() {
    let report = run(
        vec![
            Declaration::interface(COMPONENT)
                .annotate(Annotation::MergeComponent(
                    MergeArguments::new("kotlin.Unit").module("com.squareup.test.ManualModule"),
                ))
                .build(),
            Declaration::object("com.squareup.test.ManualModule")
                .annotate(Annotation::Module)
                .build(),
            Declaration::object("com.squareup.test.ContributedModule")
                .annotate(Annotation::Module)
                .contributes_to("kotlin.Unit")
                .build(),
            Declaration::class("com.squareup.test.Binding")
                .annotate(Annotation::ContributesBinding {
                    scope: FqName::new("kotlin.Unit"),
                    replaces: Vec::new(),
                    bound_type: Some(FqName::new("com.squareup.test.ParentInterface")),
                })
                .build(),
        ],
        WeldOptions::default(),
    )
    .unwrap();

    let modules = &report.merged_modules[&FqName::new(COMPONENT)];

    assert_eq!(
        modules.modules,
        [
            FqName::new("com.squareup.test.ManualModule"),
            FqName::new("com.squareup.test.ContributedModule"),
        ]
    );
    assert_eq!(modules.bindings, [FqName::new("com.squareup.test.Binding")]);
    assert!(merged(&report).is_empty());
}

#[test]
fn merge_modules_is_not_merged_as_interface() {
    let report = run(
        vec![
            Declaration::abstract_class("com.squareup.test.DaggerModule")
                .annotate(Annotation::MergeModules(MergeArguments::new("kotlin.Unit")))
                .build(),
            Declaration::object("com.squareup.test.ContributedModule")
                .annotate(Annotation::Module)
                .contributes_to("kotlin.Unit")
                .build(),
        ],
        WeldOptions::default(),
    )
    .unwrap();

    let aggregator = FqName::new("com.squareup.test.DaggerModule");
    assert!(!report.merged_supertypes.contains_key(&aggregator));
    assert_eq!(
        report.merged_modules[&aggregator].modules,
        [FqName::new("com.squareup.test.ContributedModule")]
    );
}

#[test]
fn result_does_not_depend_on_declaration_order() {
    let mut sources = vec![
        Declaration::interface(COMPONENT)
            .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
            .build(),
        Declaration::interface("com.squareup.test.ComponentInterface2")
            .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
            .build(),
        Declaration::interface("com.squareup.test.SubcomponentInterface")
            .annotate(Annotation::ContributesSubcomponent {
                scope: FqName::new("kotlin.Any"),
                parent_scope: FqName::new("kotlin.Unit"),
                modules: Vec::new(),
                exclude: Vec::new(),
            })
            .build(),
    ];
    for i in 0..6 {
        sources.push(
            Declaration::interface(&format!("com.squareup.test.Contributing{i}"))
                .contributes_to(if i % 2 == 0 { "kotlin.Unit" } else { "kotlin.Any" })
                .build(),
        );
    }

    let expected = run(sources.clone(), WeldOptions::default()).unwrap();

    let mut rng = fastrand::Rng::with_seed(0x00c0_ffee);
    for _ in 0..10 {
        rng.shuffle(&mut sources);
        assert_eq!(run(sources.clone(), WeldOptions::default()).unwrap(), expected);
    }
}

#[test]
fn warnings_are_reported() {
    let sources = vec![
        Declaration::class("com.squareup.test.ContributedClass")
            .contributes_to("kotlin.Unit")
            .build(),
    ];

    let report = run(sources.clone(), WeldOptions::default()).unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(
        report.warnings[0].declaration(),
        &FqName::new("com.squareup.test.ContributedClass")
    );

    let error = run(sources, WeldOptions::default().with_warnings_as_errors(true)).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvariantViolation);
}

#[test]
fn factories_are_generated_alongside_merging() {
    let program = Program::from_sources(
        vec![
            Declaration::interface(COMPONENT)
                .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
                .build(),
            Declaration::class("com.squareup.test.InjectClass")
                .inject_constructor(vec![Parameter::new("string", "kotlin.String")])
                .build(),
        ]
        .into_iter()
        .chain(scopes())
        .collect(),
    )
    .unwrap();

    let mut compilation = Compilation::new(program).with_options(WeldOptions::default().with_generate_factories(true));
    let report = compilation.run().unwrap();

    assert_eq!(report.factories, [FqName::new("com.squareup.test.InjectClass_Factory")]);
    assert!(compilation.host().find(&report.factories[0]).is_some());
    assert!(report.merged_supertypes.contains_key(&FqName::new(COMPONENT)));
}

#[test]
fn components_are_rejected_when_generating_factories() {
    let error = run(
        vec![
            Declaration::interface(COMPONENT)
                .annotate(Annotation::Component)
                .build(),
        ],
        WeldOptions::default().with_generate_factories(true),
    )
    .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Structural);
}

#[test]
#[traced_test]
fn merge_results_are_logged() {
    run(
        vec![
            Declaration::interface(COMPONENT)
                .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
                .build(),
            Declaration::interface("com.squareup.test.ContributingInterface")
                .contributes_to("kotlin.Unit")
                .build(),
        ],
        WeldOptions::default(),
    )
    .unwrap();

    assert!(logs_contain("weld.merge_point=com.squareup.test.ComponentInterface"));
    assert!(logs_contain("weld.added=1"));
}

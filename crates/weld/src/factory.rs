// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Factories for classes with an inject constructor.

use crate::emit::TypeSpec;
use crate::names::{ClassId, FqName};
use crate::symbols::{Declaration, DeclarationKind, FunctionSig, Parameter};

/// The DI framework's factory interface every generated factory implements.
pub const FACTORY_INTERFACE: &str = "dagger.internal.Factory";

const PROVIDER: &str = "javax.inject.Provider";
const LAZY: &str = "dagger.Lazy";

/// The identity of the factory generated for `class`: the nesting chain joined with `_`, suffixed
/// with `_Factory`, in the package of `class`.
#[must_use]
pub fn factory_id(class: &ClassId) -> ClassId {
    ClassId::new(
        class.package().iter().cloned(),
        [format!("{}_Factory", class.relative().join("_"))],
    )
}

/// Builds the factory for `declaration`, or `None` if it has no inject constructor.
///
/// The factory takes a provider for every constructor parameter. `dagger.Lazy<T>` parameters are
/// provided through `javax.inject.Provider<T>`; parameters that already are providers are kept.
#[must_use]
pub fn inject_constructor_factory(declaration: &Declaration) -> Option<TypeSpec> {
    let parameters = declaration.inject_constructor()?;
    let id = factory_id(declaration.id());

    let class_type = with_type_parameters(&declaration.fq_name(), declaration.type_parameters());
    let factory_type = with_type_parameters(&id.fq_name(), declaration.type_parameters());

    let kind = if parameters.is_empty() && declaration.type_parameters().is_empty() {
        DeclarationKind::Object
    } else {
        DeclarationKind::Class
    };

    let providers: Vec<Parameter> = parameters
        .iter()
        .map(|p| Parameter::new(p.name.clone(), provider_of(&p.type_name)))
        .collect();

    let mut spec = TypeSpec::new(kind, id).supertype(FqName::new(FACTORY_INTERFACE));
    for type_parameter in declaration.type_parameters() {
        spec = spec.type_parameter(type_parameter.clone());
    }

    let get = FunctionSig::new("get", class_type.clone()).overriding();
    let create = providers
        .iter()
        .cloned()
        .fold(FunctionSig::new("create", factory_type), FunctionSig::parameter);
    let new_instance = parameters
        .iter()
        .cloned()
        .fold(FunctionSig::new("newInstance", class_type), FunctionSig::parameter);

    for provider in providers {
        spec = spec.constructor_parameter(provider);
    }

    Some(spec.function(get).function(create).function(new_instance))
}

fn with_type_parameters(name: &FqName, type_parameters: &[String]) -> String {
    if type_parameters.is_empty() {
        name.to_string()
    } else {
        format!("{name}<{}>", type_parameters.join(", "))
    }
}

fn provider_of(type_name: &str) -> String {
    if type_name.strip_prefix(PROVIDER).is_some_and(|rest| rest.starts_with('<')) {
        return type_name.to_string();
    }

    let inner = type_name
        .strip_prefix(LAZY)
        .and_then(|rest| rest.strip_prefix('<'))
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(type_name);

    format!("{PROVIDER}<{inner}>")
}

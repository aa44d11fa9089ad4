// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The boundary to the code emission backend.

use serde::Serialize;

use crate::Result;
use crate::index::Round;
use crate::names::{ClassId, FqName};
use crate::symbols::{Annotation, Declaration, DeclarationKind, FunctionSig, Origin, Parameter};

/// A fully resolved specification of a type to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSpec {
    id: ClassId,
    kind: DeclarationKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    supertypes: Vec<FqName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<Annotation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    functions: Vec<FunctionSig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    constructor_parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    type_parameters: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nested: Vec<TypeSpec>,
}

impl TypeSpec {
    /// Starts a specification of the given kind.
    #[must_use]
    pub fn new(kind: DeclarationKind, id: ClassId) -> Self {
        Self {
            id,
            kind,
            supertypes: Vec::new(),
            annotations: Vec::new(),
            functions: Vec::new(),
            constructor_parameters: Vec::new(),
            type_parameters: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Shorthand for an interface specification.
    #[must_use]
    pub fn interface(id: ClassId) -> Self {
        Self::new(DeclarationKind::Interface, id)
    }

    /// Adds a supertype.
    #[must_use]
    pub fn supertype(mut self, supertype: FqName) -> Self {
        self.supertypes.push(supertype);
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Adds a function.
    #[must_use]
    pub fn function(mut self, function: FunctionSig) -> Self {
        self.functions.push(function);
        self
    }

    /// Adds a primary constructor parameter.
    #[must_use]
    pub fn constructor_parameter(mut self, parameter: Parameter) -> Self {
        self.constructor_parameters.push(parameter);
        self
    }

    /// Adds a type parameter.
    #[must_use]
    pub fn type_parameter(mut self, name: impl Into<String>) -> Self {
        self.type_parameters.push(name.into());
        self
    }

    /// Nests another type inside this one.
    #[must_use]
    pub fn nest(mut self, nested: Self) -> Self {
        self.nested.push(nested);
        self
    }

    /// The generated type.
    #[must_use]
    pub fn id(&self) -> &ClassId {
        &self.id
    }

    /// What sort of type is generated.
    #[must_use]
    pub fn kind(&self) -> DeclarationKind {
        self.kind
    }

    /// Supertypes.
    #[must_use]
    pub fn supertypes(&self) -> &[FqName] {
        &self.supertypes
    }

    /// Annotations.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Functions.
    #[must_use]
    pub fn functions(&self) -> &[FunctionSig] {
        &self.functions
    }

    /// Primary constructor parameters.
    #[must_use]
    pub fn constructor_parameters(&self) -> &[Parameter] {
        &self.constructor_parameters
    }

    /// Type parameters.
    #[must_use]
    pub fn type_parameters(&self) -> &[String] {
        &self.type_parameters
    }

    /// Directly nested types.
    #[must_use]
    pub fn nested(&self) -> &[Self] {
        &self.nested
    }

    /// Converts the specification and everything nested in it into declarations generated in
    /// `round`, outermost first.
    #[must_use]
    pub fn into_declarations(self, round: Round) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        self.flatten_into(round, &mut declarations);
        declarations
    }

    fn flatten_into(self, round: Round, declarations: &mut Vec<Declaration>) {
        let mut builder = Declaration::builder(self.kind, self.id).origin(Origin::Generated(round));

        for annotation in self.annotations {
            builder = builder.annotate(annotation);
        }
        for supertype in &self.supertypes {
            builder = builder.extends(supertype.as_str());
        }
        for function in self.functions {
            builder = builder.function(function);
        }
        for type_parameter in self.type_parameters {
            builder = builder.type_parameter(type_parameter);
        }

        declarations.push(builder.build());

        for nested in self.nested {
            nested.flatten_into(round, declarations);
        }
    }
}

/// A handle to a type handed to the emission backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GeneratedArtifact {
    id: ClassId,
    round: Round,
}

impl GeneratedArtifact {
    /// The generated type.
    #[must_use]
    pub fn id(&self) -> &ClassId {
        &self.id
    }

    /// The round the type was generated in.
    #[must_use]
    pub fn round(&self) -> Round {
        self.round
    }
}

/// Turns type specifications into loadable type definitions.
pub trait CodeEmitter {
    /// Emits `spec`.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot produce the type.
    fn emit(&mut self, spec: TypeSpec) -> Result<GeneratedArtifact>;
}

/// Collects the specifications emitted during one round so they can be handed to the host.
#[derive(Debug)]
pub struct EmittedTypes {
    round: Round,
    specs: Vec<TypeSpec>,
}

impl EmittedTypes {
    /// Creates an empty collector for `round`.
    #[must_use]
    pub fn new(round: Round) -> Self {
        Self {
            round,
            specs: Vec::new(),
        }
    }

    /// The collected specifications in emission order.
    #[must_use]
    pub fn specs(&self) -> &[TypeSpec] {
        &self.specs
    }

    /// Whether nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Takes the collected specifications.
    #[must_use]
    pub fn into_specs(self) -> Vec<TypeSpec> {
        self.specs
    }
}

impl CodeEmitter for EmittedTypes {
    fn emit(&mut self, spec: TypeSpec) -> Result<GeneratedArtifact> {
        let artifact = GeneratedArtifact {
            id: spec.id().clone(),
            round: self.round,
        };

        tracing::event!(
            name: "weld.emit",
            tracing::Level::TRACE,
            weld.round = self.round.number(),
            weld.generated = %spec.id().fq_name(),
        );

        self.specs.push(spec);
        Ok(artifact)
    }
}

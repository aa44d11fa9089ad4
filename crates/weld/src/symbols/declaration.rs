// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::index::Round;
use crate::names::{ClassId, FqName};
use crate::symbols::Annotation;

/// What sort of type a declaration is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    /// An interface.
    #[default]
    Interface,
    /// A concrete class.
    Class,
    /// An abstract class.
    AbstractClass,
    /// A singleton object.
    Object,
    /// An annotation class.
    Annotation,
}

/// Declared visibility of a declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible everywhere.
    #[default]
    Public,
    /// Visible within the owning module.
    Internal,
    /// Visible to subclasses.
    Protected,
    /// Visible within the enclosing scope.
    Private,
}

/// Where the host obtained a declaration from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Parsed from the sources of the current compilation.
    #[default]
    Source,
    /// Loaded from an earlier, separate compilation.
    Classpath,
    /// Generated by this compilation in the given round.
    Generated(Round),
}

/// A position in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    file: String,
    line: u32,
    column: u32,
}

impl SourcePosition {
    /// Creates a position from a file name and one-based line and column numbers.
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// The file name.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// One-based line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// One-based column number.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ({}, {})", self.file, self.line, self.column)
    }
}

/// A value parameter of a function or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Rendered type, which may carry type arguments, e.g. `javax.inject.Provider<kotlin.Int>`.
    #[serde(rename = "type")]
    pub type_name: String,
}

impl Parameter {
    /// Creates a parameter.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A function declared by a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSig {
    /// Function name.
    pub name: String,
    /// Rendered return type.
    pub returns: String,
    /// Value parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Whether the function overrides a supertype function.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_override: bool,
}

impl FunctionSig {
    /// Creates a function without parameters.
    pub fn new(name: impl Into<String>, returns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            returns: returns.into(),
            parameters: Vec::new(),
            is_override: false,
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Marks the function as overriding a supertype function.
    #[must_use]
    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }
}

/// A read-only view of a type declaration owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    id: ClassId,
    #[serde(default)]
    kind: DeclarationKind,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    supertypes: Vec<FqName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    functions: Vec<FunctionSig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inject_constructor: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    type_parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<SourcePosition>,
    #[serde(skip)]
    origin: Origin,
}

impl Declaration {
    /// Starts building a declaration of the given kind.
    pub fn builder(kind: DeclarationKind, id: ClassId) -> DeclarationBuilder {
        DeclarationBuilder {
            declaration: Self {
                id,
                kind,
                visibility: Visibility::Public,
                annotations: Vec::new(),
                supertypes: Vec::new(),
                functions: Vec::new(),
                inject_constructor: None,
                type_parameters: Vec::new(),
                module: None,
                position: None,
                origin: Origin::Source,
            },
        }
    }

    /// Starts building an interface; see [`ClassId::best_guess`] for how `name` is split.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn interface(name: &str) -> DeclarationBuilder {
        Self::builder(DeclarationKind::Interface, ClassId::best_guess(name))
    }

    /// Starts building a concrete class.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn class(name: &str) -> DeclarationBuilder {
        Self::builder(DeclarationKind::Class, ClassId::best_guess(name))
    }

    /// Starts building an abstract class.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn abstract_class(name: &str) -> DeclarationBuilder {
        Self::builder(DeclarationKind::AbstractClass, ClassId::best_guess(name))
    }

    /// Starts building an object.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn object(name: &str) -> DeclarationBuilder {
        Self::builder(DeclarationKind::Object, ClassId::best_guess(name))
    }

    /// The class id.
    #[must_use]
    pub fn id(&self) -> &ClassId {
        &self.id
    }

    /// The fully qualified name.
    #[must_use]
    pub fn fq_name(&self) -> FqName {
        self.id.fq_name()
    }

    /// What sort of type this is.
    #[must_use]
    pub fn kind(&self) -> DeclarationKind {
        self.kind
    }

    /// Whether the declaration is an interface.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == DeclarationKind::Interface
    }

    /// The declared visibility, not taking enclosing declarations into account.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Direct annotations.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Direct supertypes as declared in source.
    #[must_use]
    pub fn supertypes(&self) -> &[FqName] {
        &self.supertypes
    }

    /// Declared functions.
    #[must_use]
    pub fn functions(&self) -> &[FunctionSig] {
        &self.functions
    }

    /// Parameters of the inject constructor, if the declaration has one.
    #[must_use]
    pub fn inject_constructor(&self) -> Option<&[Parameter]> {
        self.inject_constructor.as_deref()
    }

    /// Names of the type parameters.
    #[must_use]
    pub fn type_parameters(&self) -> &[String] {
        &self.type_parameters
    }

    /// The module (compilation unit) that owns the declaration, if the host knows it.
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// The source position, if the host provided one.
    #[must_use]
    pub fn position(&self) -> Option<&SourcePosition> {
        self.position.as_ref()
    }

    /// Where the host obtained the declaration from.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Whether the declaration carries the DI module annotation.
    #[must_use]
    pub fn is_module(&self) -> bool {
        self.annotations.contains(&Annotation::Module)
    }

    pub(crate) fn set_origin(&mut self, origin: Origin) {
        self.origin = origin;
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fq_name())
    }
}

/// Builds a [`Declaration`].
///
/// # Examples
///
/// ```
/// use weld::symbols::{Annotation, Declaration, SourcePosition};
///
/// let foo = Declaration::interface("com.squareup.test.Foo")
///     .contributes_to("kotlin.Unit")
///     .at(SourcePosition::new("Foo.kt", 3, 1))
///     .build();
///
/// assert!(foo.is_interface());
/// assert_eq!(foo.fq_name().as_str(), "com.squareup.test.Foo");
/// ```
#[derive(Debug, Clone)]
pub struct DeclarationBuilder {
    declaration: Declaration,
}

impl DeclarationBuilder {
    /// Sets the declared visibility.
    #[must_use]
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.declaration.visibility = visibility;
        self
    }

    /// Adds a direct annotation.
    #[must_use]
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.declaration.annotations.push(annotation);
        self
    }

    /// Shorthand for a `ContributesTo` annotation without replacements.
    #[must_use]
    pub fn contributes_to(self, scope: &str) -> Self {
        self.annotate(Annotation::ContributesTo {
            scope: FqName::new(scope),
            replaces: Vec::new(),
        })
    }

    /// Adds a direct supertype.
    #[must_use]
    pub fn extends(mut self, supertype: &str) -> Self {
        self.declaration.supertypes.push(FqName::new(supertype));
        self
    }

    /// Adds a declared function.
    #[must_use]
    pub fn function(mut self, function: FunctionSig) -> Self {
        self.declaration.functions.push(function);
        self
    }

    /// Declares an inject constructor with the given parameters.
    #[must_use]
    pub fn inject_constructor(mut self, parameters: Vec<Parameter>) -> Self {
        self.declaration.inject_constructor = Some(parameters);
        self
    }

    /// Adds a type parameter.
    #[must_use]
    pub fn type_parameter(mut self, name: impl Into<String>) -> Self {
        self.declaration.type_parameters.push(name.into());
        self
    }

    /// Sets the owning module.
    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.declaration.module = Some(module.into());
        self
    }

    /// Sets the source position.
    #[must_use]
    pub fn at(mut self, position: SourcePosition) -> Self {
        self.declaration.position = Some(position);
        self
    }

    /// Sets the origin.
    #[must_use]
    pub fn origin(mut self, origin: Origin) -> Self {
        self.declaration.origin = origin;
        self
    }

    /// Finishes the declaration.
    #[must_use]
    pub fn build(self) -> Declaration {
        self.declaration
    }
}

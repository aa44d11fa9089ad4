// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The symbol resolution facade: declarations, annotations and the host model they come from.

mod annotation;
mod declaration;
mod facade;
mod model;

pub use annotation::{Annotation, MergeAnnotation, MergeArguments, MergeKind};
pub use declaration::{
    Declaration, DeclarationBuilder, DeclarationKind, FunctionSig, Origin, Parameter, SourcePosition, Visibility,
};
pub use facade::Symbols;
pub use model::{Host, SemanticModel};

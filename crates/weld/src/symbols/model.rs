// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Result;
use crate::emit::TypeSpec;
use crate::names::{ClassId, FqName};
use crate::symbols::Declaration;

/// The host compiler's semantic model, as far as the engine needs it.
///
/// Implementations own every [`Declaration`]; the engine only ever borrows them. Declarations
/// generated in round `N` become visible through this trait only after [`Host::next_round`] has
/// been called with them.
pub trait SemanticModel {
    /// Looks up a declaration by its fully qualified name, including classpath declarations.
    fn find(&self, name: &FqName) -> Option<&Declaration>;

    /// Declarations belonging to the current compilation: parsed sources plus everything generated
    /// in earlier rounds.
    fn source_declarations(&self) -> Box<dyn Iterator<Item = &Declaration> + '_>;

    /// Declarations nested directly inside `owner`.
    fn nested(&self, owner: &ClassId) -> Vec<&Declaration>;
}

/// A host that can run further compilation rounds.
pub trait Host: SemanticModel {
    /// Makes the types emitted during the current round visible and starts the next round.
    ///
    /// # Errors
    ///
    /// Fails if an emitted type clashes with a declaration the host already knows.
    fn next_round(&mut self, emitted: Vec<TypeSpec>) -> Result<()>;
}

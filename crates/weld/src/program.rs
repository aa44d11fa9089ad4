// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;

use serde::Deserialize;

use crate::emit::TypeSpec;
use crate::index::Round;
use crate::names::{ClassId, FqName};
use crate::symbols::{Declaration, Host, Origin, SemanticModel};
use crate::{Error, ErrorKind, Result};

/// An in-memory host model made of source declarations and declarations from earlier compilations.
///
/// Deserializes from `{ "sources": [...], "classpath": [...] }`; both lists are optional.
///
/// # Examples
///
/// ```
/// use weld::Program;
/// use weld::names::FqName;
/// use weld::symbols::SemanticModel;
///
/// let program: Program = serde_json::from_str(
///     r#"{ "sources": [{ "id": "com.example/Foo" }], "classpath": [{ "id": "com.example/Bar" }] }"#,
/// )
/// .unwrap();
///
/// assert!(program.find(&FqName::new("com.example.Bar")).is_some());
/// assert_eq!(program.source_declarations().count(), 1);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ProgramFile")]
pub struct Program {
    declarations: Vec<Declaration>,
    by_name: HashMap<FqName, usize>,
    round: Round,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProgramFile {
    #[serde(default)]
    sources: Vec<Declaration>,
    #[serde(default)]
    classpath: Vec<Declaration>,
}

impl TryFrom<ProgramFile> for Program {
    type Error = Error;

    fn try_from(file: ProgramFile) -> Result<Self> {
        Self::new(file.sources, file.classpath)
    }
}

impl Program {
    /// Creates a program from the sources of the current compilation and the classpath.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if two declarations share a name.
    pub fn new(sources: Vec<Declaration>, classpath: Vec<Declaration>) -> Result<Self> {
        let mut program = Self {
            declarations: Vec::with_capacity(sources.len() + classpath.len()),
            by_name: HashMap::new(),
            round: Round::FIRST,
        };

        for declaration in sources {
            program.insert(declaration, Origin::Source)?;
        }
        for declaration in classpath {
            program.insert(declaration, Origin::Classpath)?;
        }

        Ok(program)
    }

    /// Creates a program without a classpath.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if two declarations share a name.
    pub fn from_sources(sources: Vec<Declaration>) -> Result<Self> {
        Self::new(sources, Vec::new())
    }

    /// The round the host is currently in.
    #[must_use]
    pub fn round(&self) -> Round {
        self.round
    }

    /// Declarations generated so far, in generation order.
    pub fn generated(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(|d| matches!(d.origin(), Origin::Generated(_)))
    }

    fn insert(&mut self, mut declaration: Declaration, origin: Origin) -> Result<()> {
        let name = declaration.fq_name();
        if self.by_name.contains_key(&name) {
            return Err(Error::at(
                ErrorKind::InvariantViolation,
                &declaration,
                format!("{name} is declared more than once."),
            ));
        }

        declaration.set_origin(origin);
        self.by_name.insert(name, self.declarations.len());
        self.declarations.push(declaration);
        Ok(())
    }
}

impl SemanticModel for Program {
    fn find(&self, name: &FqName) -> Option<&Declaration> {
        self.by_name.get(name).map(|&i| &self.declarations[i])
    }

    fn source_declarations(&self) -> Box<dyn Iterator<Item = &Declaration> + '_> {
        Box::new(self.declarations.iter().filter(|d| d.origin() != Origin::Classpath))
    }

    fn nested(&self, owner: &ClassId) -> Vec<&Declaration> {
        let mut nested: Vec<&Declaration> = self
            .declarations
            .iter()
            .filter(|d| d.id().outer().as_ref() == Some(owner))
            .collect();
        nested.sort_by(|a, b| a.id().cmp(b.id()));
        nested
    }
}

impl Host for Program {
    fn next_round(&mut self, emitted: Vec<TypeSpec>) -> Result<()> {
        let round = self.round;

        for spec in emitted {
            for declaration in spec.into_declarations(round) {
                let origin = declaration.origin();
                self.insert(declaration, origin)?;
            }
        }

        self.round = round.next();
        Ok(())
    }
}

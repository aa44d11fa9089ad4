// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Checks over the source declarations that run before any code is generated.

use std::fmt;

use serde::Serialize;

use crate::contribution::ContributionKind;
use crate::names::FqName;
use crate::options::WeldOptions;
use crate::symbols::{Annotation, Declaration, SourcePosition, Symbols};
use crate::{Error, ErrorKind, Result};

/// A diagnostic that does not stop the compilation unless warnings are treated as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    declaration: FqName,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<SourcePosition>,
}

impl Warning {
    fn at(declaration: &Declaration, message: String) -> Self {
        Self {
            declaration: declaration.fq_name(),
            message,
            position: declaration.position().cloned(),
        }
    }

    /// The declaration the warning is about.
    #[must_use]
    pub fn declaration(&self) -> &FqName {
        &self.declaration
    }

    /// The message without the location prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(position) = &self.position {
            write!(f, "{position}: ")?;
        }
        f.write_str(&self.message)
    }
}

/// Fails if factories are generated while the sources declare DI components, which need the DI
/// framework's own annotation processor anyway.
///
/// # Errors
///
/// Returns a structural error for the first source declaration annotated as a component.
pub fn detect_components(symbols: &Symbols<'_>, options: &WeldOptions) -> Result<()> {
    if !options.generate_factories() {
        return Ok(());
    }

    let mut sources: Vec<&Declaration> = symbols.source_declarations().collect();
    sources.sort_by(|a, b| a.id().cmp(b.id()));

    match sources
        .into_iter()
        .find(|d| d.annotations().contains(&Annotation::Component))
    {
        Some(component) => Err(Error::at(
            ErrorKind::Structural,
            component,
            "Cannot generate the code for DI components. The DI framework's annotation processor is required for \
             them, which makes generating factories redundant. Set 'generate-factories' to false.",
        )),
        None => Ok(()),
    }
}

/// Collects a warning for every source declaration contributed with `ContributesTo` that is neither
/// an interface nor a DI module. Such contributions are never merged.
///
/// # Errors
///
/// With warnings treated as errors the first warning is returned as an invariant violation.
pub fn unmergeable_contributions(symbols: &Symbols<'_>, options: &WeldOptions) -> Result<Vec<Warning>> {
    let mut sources: Vec<&Declaration> = symbols.source_declarations().collect();
    sources.sort_by(|a, b| a.id().cmp(b.id()));

    let mut warnings = Vec::new();

    for declaration in sources {
        let scopes = symbols.contribution_scopes(declaration, &[ContributionKind::To]);
        if scopes.is_empty() || declaration.is_interface() || declaration.is_module() {
            continue;
        }

        let scopes: Vec<&str> = scopes.iter().map(FqName::as_str).collect();
        let message = format!(
            "{declaration} is contributed to {}, but only interfaces and DI modules can be merged. The contribution \
             is ignored.",
            scopes.join(", ")
        );

        if options.treats_warnings_as_errors() {
            return Err(Error::at(ErrorKind::InvariantViolation, declaration, message));
        }

        tracing::event!(
            name: "weld.warning",
            tracing::Level::WARN,
            weld.declaration = %declaration,
            weld.message = %message,
        );

        warnings.push(Warning::at(declaration, message));
    }

    Ok(warnings)
}

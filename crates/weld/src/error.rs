// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use crate::names::FqName;
use crate::symbols::{Declaration, SourcePosition};

/// A specialized `Result` for operations of the contribution engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies an [`Error`].
///
/// Every kind is fatal to the current compilation. None of them are transient: all stem from a
/// static misconfiguration of the sources, so retrying reproduces the same failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A required symbol, scope or type argument could not be resolved.
    Resolution,

    /// A contributed declaration is not publicly visible.
    Visibility,

    /// The target of a replacement or exclusion is contributed to a different scope.
    ScopeMismatch,

    /// The target of a replacement is not an interface.
    Type,

    /// An exclusion contradicts explicit inheritance, or annotations are duplicated or ambiguous.
    InvariantViolation,

    /// Malformed declarations, e.g. a merge point that is not an interface or a nested declaration
    /// contributed to its own outer declaration.
    Structural,

    /// Subcomponent materialization did not reach a fixed point within the configured round limit.
    Cycle,

    /// Reading or writing marker records failed.
    Marker,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolution => "resolution error",
            Self::Visibility => "visibility error",
            Self::ScopeMismatch => "scope mismatch",
            Self::Type => "type error",
            Self::InvariantViolation => "invariant violation",
            Self::Structural => "structural error",
            Self::Cycle => "cycle error",
            Self::Marker => "marker error",
        };

        f.write_str(name)
    }
}

/// A compilation-halting diagnostic.
///
/// The error names the offending declaration and, when the host knows it, the source position of
/// that declaration. The message is written to be actionable: conflicting declarations and their
/// scopes are spelled out.
///
/// # Examples
///
/// ```
/// use weld::{Error, ErrorKind};
///
/// let error = Error::new(ErrorKind::Resolution, "Unable to resolve type for com.example.Missing");
/// assert_eq!(error.kind(), ErrorKind::Resolution);
/// assert_eq!(error.to_string(), "Unable to resolve type for com.example.Missing");
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{location}{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    declaration: Option<FqName>,
    location: Location,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// Creates an error that is not attached to any declaration.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            declaration: None,
            location: Location(None),
            source: None,
        }
    }

    /// Creates an error attached to `declaration`, reporting its source position when available.
    pub fn at(kind: ErrorKind, declaration: &Declaration, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            declaration: Some(declaration.fq_name()),
            location: Location(declaration.position().cloned()),
            source: None,
        }
    }

    pub(crate) fn marker(message: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(ErrorKind::Marker, message)
        }
    }

    /// The kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The diagnostic message without the source location prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The declaration the diagnostic is attached to, if any.
    #[must_use]
    pub fn declaration(&self) -> Option<&FqName> {
        self.declaration.as_ref()
    }

    /// The source position of the offending declaration, if the host provided one.
    #[must_use]
    pub fn position(&self) -> Option<&SourcePosition> {
        self.location.0.as_ref()
    }
}

#[derive(Debug)]
struct Location(Option<SourcePosition>);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(position) => write!(f, "{position}: "),
            None => Ok(()),
        }
    }
}

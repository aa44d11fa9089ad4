// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Names of declarations and scopes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A fully qualified name such as `com.squareup.test.Outer.Inner`.
///
/// Scopes are identified purely by their fully qualified name: two scopes are equal if and only if
/// their names are equal.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FqName(Arc<str>);

impl FqName {
    /// Creates a name from its dotted string form.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The dotted string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last segment of the name.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Debug for FqName {
    #[cfg_attr(test, mutants::skip)] // Diagnostics only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FqName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FqName {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl AsRef<str> for FqName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifies a declaration by its package and its chain of enclosing declarations.
///
/// Unlike a [`FqName`], a class id knows where the package ends and the nesting chain starts,
/// which the generated-name strategy relies on.
///
/// The string form separates the two parts with a slash: `com.squareup.test/Outer.Inner`. When
/// parsing a string without a slash, the first segment starting with an uppercase letter is taken
/// as the start of the nesting chain.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClassId {
    package: Vec<String>,
    relative: Vec<String>,
}

impl ClassId {
    /// Creates a class id from package segments and the nesting chain.
    ///
    /// # Panics
    ///
    /// Panics if `relative` is empty; every declaration has at least a simple name.
    pub fn new<P, R>(package: P, relative: R) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let relative: Vec<String> = relative.into_iter().map(Into::into).collect();
        assert!(!relative.is_empty(), "a class id needs at least a simple name");

        Self {
            package: package.into_iter().map(Into::into).filter(|s: &String| !s.is_empty()).collect(),
            relative,
        }
    }

    /// Package segments, empty for the root package.
    #[must_use]
    pub fn package(&self) -> &[String] {
        &self.package
    }

    /// The nesting chain, outermost first. Never empty.
    #[must_use]
    pub fn relative(&self) -> &[String] {
        &self.relative
    }

    /// The innermost simple name.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.relative.last().map_or("", String::as_str)
    }

    /// The dotted package name, empty for the root package.
    #[must_use]
    pub fn package_name(&self) -> String {
        self.package.join(".")
    }

    /// The fully qualified name of the declaration.
    #[must_use]
    pub fn fq_name(&self) -> FqName {
        FqName::from(self.package.iter().chain(&self.relative).cloned().collect::<Vec<_>>().join("."))
    }

    /// The id of the directly enclosing declaration, if this one is nested.
    #[must_use]
    pub fn outer(&self) -> Option<Self> {
        (self.relative.len() > 1).then(|| Self {
            package: self.package.clone(),
            relative: self.relative[..self.relative.len() - 1].to_vec(),
        })
    }

    /// All enclosing declarations, innermost first.
    pub fn enclosing(&self) -> impl Iterator<Item = Self> + '_ {
        (1..self.relative.len()).rev().map(|len| Self {
            package: self.package.clone(),
            relative: self.relative[..len].to_vec(),
        })
    }

    /// The id of a declaration nested directly inside this one.
    #[must_use]
    pub fn nested(&self, name: impl Into<String>) -> Self {
        let mut relative = self.relative.clone();
        relative.push(name.into());

        Self {
            package: self.package.clone(),
            relative,
        }
    }

    /// Guesses the package boundary of a dotted name: the first segment that starts with an
    /// uppercase letter begins the nesting chain.
    ///
    /// # Panics
    ///
    /// Panics if `fq_name` has no non-empty segment; every declaration has at least a simple name.
    #[must_use]
    pub fn best_guess(fq_name: &str) -> Self {
        match Self::guess(fq_name) {
            Some(id) => id,
            None => panic!("'{fq_name}' has no simple name"),
        }
    }

    fn guess(fq_name: &str) -> Option<Self> {
        let segments: Vec<&str> = fq_name.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return None;
        }

        let class_index = segments
            .iter()
            .position(|s| s.chars().next().is_some_and(char::is_uppercase))
            .unwrap_or(segments.len() - 1);

        Some(Self {
            package: segments[..class_index].iter().map(ToString::to_string).collect(),
            relative: segments[class_index..].iter().map(ToString::to_string).collect(),
        })
    }
}

impl fmt::Debug for ClassId {
    #[cfg_attr(test, mutants::skip)] // Diagnostics only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({self})")
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package.join("."), self.relative.join("."))
    }
}

/// The string could not be parsed as a [`ClassId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid class id")]
pub struct ParseClassIdError(String);

impl FromStr for ClassId {
    type Err = ParseClassIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseClassIdError(s.to_string());

        if s.is_empty() {
            return Err(invalid());
        }

        let Some((package, relative)) = s.split_once('/') else {
            return Self::guess(s).ok_or_else(invalid);
        };

        let relative: Vec<&str> = relative.split('.').collect();
        if relative.iter().any(|segment| segment.is_empty()) {
            return Err(invalid());
        }

        Ok(Self::new(package.split('.'), relative))
    }
}

impl TryFrom<String> for ClassId {
    type Error = ParseClassIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClassId> for String {
    fn from(value: ClassId) -> Self {
        value.to_string()
    }
}

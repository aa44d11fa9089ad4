// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Identities of generated declarations.
//!
//! A generated subcomponent lives in a package that encodes its owner, and its class name encodes
//! only the nesting chain of the contributed subcomponent. Deep chains of generated subcomponents
//! therefore grow the package, never the class name.
//!
//! The mapping is injective: nesting chains are joined with `_` and a literal `_` inside a segment
//! is written as `_1`. Identifiers never start with a digit, so the encoding can be decoded
//! unambiguously and distinct inputs never share a generated identity.

use crate::names::ClassId;

/// Package segments every generated subcomponent is placed under.
pub const COMPONENT_PACKAGE_PREFIX: [&str; 2] = ["weld", "component"];

/// Simple name of the parent accessor interface nested in each generated subcomponent.
pub const PARENT_COMPONENT: &str = "ParentComponent";

/// Simple name of the generated factory nested in a generated subcomponent.
pub const SUBCOMPONENT_FACTORY: &str = "SubcomponentFactory";

const CLASS_SUFFIX: &str = "A";

/// The identity of the subcomponent generated for `subcomponent` under the merge point `owner`.
///
/// # Examples
///
/// ```
/// use weld::names::ClassId;
/// use weld::naming::generated_subcomponent;
///
/// let owner: ClassId = "com.squareup.test/ComponentInterface".parse().unwrap();
/// let subcomponent: ClassId = "com.squareup.test/SubcomponentInterface".parse().unwrap();
///
/// assert_eq!(
///     generated_subcomponent(&owner, &subcomponent).to_string(),
///     "weld.component.com.squareup.test.ComponentInterface/SubcomponentInterfaceA"
/// );
/// ```
#[must_use]
pub fn generated_subcomponent(owner: &ClassId, subcomponent: &ClassId) -> ClassId {
    let package = COMPONENT_PACKAGE_PREFIX
        .iter()
        .map(ToString::to_string)
        .chain(owner.package().iter().cloned())
        .chain(std::iter::once(escape(owner.relative())));

    ClassId::new(package, [format!("{}{CLASS_SUFFIX}", escape(subcomponent.relative()))])
}

/// The parent accessor interface nested in the generated subcomponent.
#[must_use]
pub fn parent_component(owner: &ClassId, subcomponent: &ClassId) -> ClassId {
    generated_subcomponent(owner, subcomponent).nested(PARENT_COMPONENT)
}

/// The factory nested in the generated subcomponent.
#[must_use]
pub fn subcomponent_factory(owner: &ClassId, subcomponent: &ClassId) -> ClassId {
    generated_subcomponent(owner, subcomponent).nested(SUBCOMPONENT_FACTORY)
}

/// Joins `segments` into a single identifier that can be split again with [`unescape`].
#[must_use]
pub fn escape(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| segment.replace('_', "_1"))
        .collect::<Vec<_>>()
        .join("_")
}

/// Splits an identifier produced by [`escape`] into its segments.
#[must_use]
pub fn unescape(escaped: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = escaped.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' {
            current.push(c);
        } else if chars.peek() == Some(&'1') {
            chars.next();
            current.push('_');
        } else {
            segments.push(std::mem::take(&mut current));
        }
    }

    segments.push(current);
    segments
}

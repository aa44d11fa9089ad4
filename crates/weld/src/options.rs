// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Deserializer};

const DEFAULT_MAX_ROUNDS: u32 = 64;

/// Configuration of a [`Compilation`](crate::Compilation), read once when it is created.
///
/// Options deserialize from kebab-case keys; missing keys keep their defaults.
///
/// # Examples
///
/// ```
/// use weld::WeldOptions;
///
/// let options: WeldOptions = serde_json::from_str(r#"{ "generate-factories": true }"#).unwrap();
/// assert!(options.generate_factories());
/// assert_eq!(options.max_rounds(), 64);
///
/// let options = WeldOptions::default().with_warnings_as_errors(true).with_max_rounds(8);
/// assert!(options.treats_warnings_as_errors());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
#[expect(clippy::struct_excessive_bools, reason = "independent switches mirroring the options file")]
pub struct WeldOptions {
    generate_factories: bool,
    generate_factories_only: bool,
    disable_component_merging: bool,
    warnings_as_errors: bool,
    #[serde(deserialize_with = "at_least_one")]
    max_rounds: u32,
}

impl Default for WeldOptions {
    fn default() -> Self {
        Self {
            generate_factories: false,
            generate_factories_only: false,
            disable_component_merging: false,
            warnings_as_errors: false,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl WeldOptions {
    /// Generates factories for inject constructors.
    #[must_use]
    pub fn generate_factories(&self) -> bool {
        self.generate_factories || self.generate_factories_only
    }

    /// Only generates factories; contribution merging and subcomponents are skipped.
    #[must_use]
    pub fn generate_factories_only(&self) -> bool {
        self.generate_factories_only
    }

    /// Skips merging contributions into components. Subcomponents are still generated.
    #[must_use]
    pub fn component_merging_disabled(&self) -> bool {
        self.disable_component_merging
    }

    /// Whether warnings abort the compilation.
    #[must_use]
    pub fn treats_warnings_as_errors(&self) -> bool {
        self.warnings_as_errors
    }

    /// Upper bound on generating rounds before materialization is considered cyclic.
    #[must_use]
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Sets whether factories are generated.
    #[must_use]
    pub fn with_generate_factories(mut self, enabled: bool) -> Self {
        self.generate_factories = enabled;
        self
    }

    /// Sets whether only factories are generated.
    #[must_use]
    pub fn with_generate_factories_only(mut self, enabled: bool) -> Self {
        self.generate_factories_only = enabled;
        self
    }

    /// Sets whether merging is skipped.
    #[must_use]
    pub fn with_component_merging_disabled(mut self, disabled: bool) -> Self {
        self.disable_component_merging = disabled;
        self
    }

    /// Sets whether warnings abort the compilation.
    #[must_use]
    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    /// Sets the round limit. A limit of zero is raised to one.
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }
}

fn at_least_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    u32::deserialize(deserializer).map(|rounds| rounds.max(1))
}

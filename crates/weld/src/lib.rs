// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

//! Compile-time resolution and merging of dependency injection contributions.
//!
//! Declarations contribute themselves to a named *scope*. Merge points collect everything
//! contributed to their scope: contributed interfaces become supertypes of the merge point,
//! contributed modules and bindings are added to the component, and contributed subcomponents are
//! generated as nested components of the merge point.
//!
//! Generated subcomponents are merge points themselves, so a [`Compilation`] runs in rounds. Each
//! round the [`ClassScanner`] refreshes the [`ContributionIndex`] and the
//! [`SubcomponentMaterializer`] generates the subcomponents that became reachable. Once a round
//! generates nothing the [`InterfaceMerger`] computes the final supertypes of every merge point.
//!
//! # Quick Start
//!
//! ```rust
//! use weld::names::FqName;
//! use weld::symbols::{Annotation, Declaration, MergeArguments};
//! use weld::{Compilation, Program};
//!
//! let scope = "com.example.AppScope";
//! let program = Program::from_sources(vec![
//!     Declaration::class(scope).build(),
//!     Declaration::interface("com.example.UserComponent")
//!         .annotate(Annotation::ContributesSubcomponent {
//!             scope: FqName::new("com.example.UserScope"),
//!             parent_scope: FqName::new(scope),
//!             modules: Vec::new(),
//!             exclude: Vec::new(),
//!         })
//!         .build(),
//!     Declaration::class("com.example.UserScope").build(),
//!     Declaration::interface("com.example.AppComponent")
//!         .annotate(Annotation::MergeComponent(MergeArguments::new(scope)))
//!         .build(),
//! ])
//! .unwrap();
//!
//! let report = Compilation::new(program).run().unwrap();
//!
//! assert_eq!(report.generation_rounds, 1);
//! assert_eq!(
//!     report.subcomponents[0].component().to_string(),
//!     "weld.component.com.example.AppComponent/UserComponentA"
//! );
//! ```
//!
//! # Hosts
//!
//! The engine never parses sources itself. It reads declarations through the [`SemanticModel`]
//! trait and hands generated types back through [`Host::next_round`]. [`Program`] is an in-memory
//! host that can be loaded from JSON.
//!
//! [`SemanticModel`]: symbols::SemanticModel
//! [`Host::next_round`]: symbols::Host::next_round

pub mod checks;
mod compilation;
mod contribution;
pub mod emit;
mod error;
pub mod factory;
mod index;
pub mod markers;
mod materializer;
mod merger;
pub mod names;
pub mod naming;
mod options;
mod program;
mod resolver;
mod scanner;
pub mod symbols;

pub use compilation::{Compilation, CompilationReport};
pub use contribution::{Contribution, ContributionDetails, ContributionKind};
pub use error::{Error, ErrorKind, Result};
pub use index::{ContributionIndex, Contributions, IndexEntry, Round};
pub use materializer::{SubcomponentMaterializer, SubcomponentRecord};
pub use merger::{InterfaceMerger, MergeOutcome};
pub use options::WeldOptions;
pub use program::Program;
pub use resolver::{ContributionResolver, MergedModules};
pub use scanner::ClassScanner;

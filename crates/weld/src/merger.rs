// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::names::FqName;
use crate::resolver::ContributionResolver;
use crate::symbols::{Declaration, Symbols};
use crate::{Error, ErrorKind, Result};

/// What [`InterfaceMerger::add_synthetic_supertypes`] did with a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The declaration does not merge interfaces; its supertypes were left alone.
    NotAMergePoint,

    /// Contributed interfaces were merged.
    Merged {
        /// Number of supertypes appended by this invocation.
        added: usize,
    },
}

/// Adds contributed interfaces to the supertypes of merge points.
///
/// This is the hook the host calls while computing the supertypes of a declaration.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceMerger<'a> {
    symbols: Symbols<'a>,
    resolver: ContributionResolver<'a>,
}

impl<'a> InterfaceMerger<'a> {
    /// Creates a merger resolving contributions with `resolver`.
    #[must_use]
    pub fn new(symbols: Symbols<'a>, resolver: ContributionResolver<'a>) -> Self {
        Self { symbols, resolver }
    }

    /// Appends the resolved contributions of `declaration` to `supertypes`.
    ///
    /// Names already present are not appended again, so calling this repeatedly with an unchanged
    /// index leaves `supertypes` unchanged after the first call.
    ///
    /// # Errors
    ///
    /// Returns a structural error if a merge point is not an interface, and any error of
    /// [`ContributionResolver::resolve_for_merge`].
    pub fn add_synthetic_supertypes(
        &self,
        declaration: &Declaration,
        supertypes: &mut Vec<FqName>,
    ) -> Result<MergeOutcome> {
        let Some(merge) = self.symbols.merge_annotation(declaration)? else {
            return Ok(MergeOutcome::NotAMergePoint);
        };

        if !merge.kind().merges_interfaces() {
            return Ok(MergeOutcome::NotAMergePoint);
        }

        if !declaration.is_interface() {
            return Err(Error::at(
                ErrorKind::Structural,
                declaration,
                "Merged components must be interfaces.",
            ));
        }

        let mut added = 0;
        for name in self.resolver.resolve_for_merge(declaration, &merge)? {
            if !supertypes.contains(&name) {
                supertypes.push(name);
                added += 1;
            }
        }

        tracing::event!(
            name: "weld.merge.merged",
            tracing::Level::DEBUG,
            weld.merge_point = %declaration,
            weld.scope = %merge.scope(),
            weld.added = added,
        );

        Ok(MergeOutcome::Merged { added })
    }

    /// The declared supertypes of `declaration` followed by its merged contributions, or `None` if
    /// it is not a merge point.
    ///
    /// # Errors
    ///
    /// See [`InterfaceMerger::add_synthetic_supertypes`].
    pub fn merged_supertypes(&self, declaration: &Declaration) -> Result<Option<Vec<FqName>>> {
        let mut supertypes = declaration.supertypes().to_vec();

        match self.add_synthetic_supertypes(declaration, &mut supertypes)? {
            MergeOutcome::NotAMergePoint => Ok(None),
            MergeOutcome::Merged { .. } => Ok(Some(supertypes)),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::index::{ContributionIndex, Round};
    use crate::markers::InMemoryMarkerStore;
    use crate::program::Program;
    use crate::scanner::ClassScanner;
    use crate::symbols::{Annotation, MergeArguments, SourcePosition};

    fn program(merge_point: Declaration) -> Program {
        Program::from_sources(vec![
            Declaration::class("kotlin.Unit").build(),
            Declaration::interface("com.squareup.test.Foo").contributes_to("kotlin.Unit").build(),
            Declaration::interface("com.squareup.test.Bar").contributes_to("kotlin.Unit").build(),
            merge_point,
        ])
        .unwrap()
    }

    fn index(program: &Program) -> ContributionIndex {
        let mut index = ContributionIndex::new();
        ClassScanner::new()
            .refresh(&Symbols::new(program), &mut InMemoryMarkerStore::new(), &mut index, Round::FIRST)
            .unwrap();
        index
    }

    #[test]
    fn merging_is_idempotent() {
        let merge_point = Declaration::interface("com.squareup.test.ComponentInterface")
            .annotate(Annotation::MergeInterfaces(MergeArguments::new("kotlin.Unit")))
            .extends("com.squareup.test.Foo")
            .build();
        let program = program(merge_point.clone());
        let index = index(&program);
        let symbols = Symbols::new(&program);
        let merger = InterfaceMerger::new(symbols, ContributionResolver::new(symbols, &index));

        let mut supertypes = merge_point.supertypes().to_vec();
        let first = merger.add_synthetic_supertypes(&merge_point, &mut supertypes).unwrap();
        let after_first = supertypes.clone();
        let second = merger.add_synthetic_supertypes(&merge_point, &mut supertypes).unwrap();

        assert_eq!(first, MergeOutcome::Merged { added: 1 });
        assert_eq!(second, MergeOutcome::Merged { added: 0 });
        assert_eq!(supertypes, after_first);
        assert_eq!(
            supertypes,
            [FqName::new("com.squareup.test.Foo"), FqName::new("com.squareup.test.Bar")]
        );
    }

    #[test]
    fn merge_point_must_be_an_interface() {
        let merge_point = Declaration::abstract_class("com.squareup.test.ComponentInterface")
            .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
            .at(SourcePosition::new("Source0.kt", 6, 1))
            .build();
        let program = program(merge_point.clone());
        let index = index(&program);
        let symbols = Symbols::new(&program);

        let error = InterfaceMerger::new(symbols, ContributionResolver::new(symbols, &index))
            .merged_supertypes(&merge_point)
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Structural);
        insta::assert_snapshot!(error, @"Source0.kt: (6, 1): Merged components must be interfaces.");
    }

    #[test]
    fn merge_modules_is_not_a_merge_point() {
        let merge_point = Declaration::abstract_class("com.squareup.test.DaggerModule")
            .annotate(Annotation::MergeModules(MergeArguments::new("kotlin.Unit")))
            .build();
        let program = program(merge_point.clone());
        let index = index(&program);
        let symbols = Symbols::new(&program);
        let merger = InterfaceMerger::new(symbols, ContributionResolver::new(symbols, &index));

        let mut supertypes = Vec::new();

        assert_eq!(
            merger.add_synthetic_supertypes(&merge_point, &mut supertypes).unwrap(),
            MergeOutcome::NotAMergePoint
        );
        assert!(supertypes.is_empty());
    }
}

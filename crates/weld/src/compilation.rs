// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::checks::{self, Warning};
use crate::contribution::ContributionKind;
use crate::emit::{CodeEmitter, EmittedTypes};
use crate::factory;
use crate::index::{ContributionIndex, Round};
use crate::markers::{InMemoryMarkerStore, MarkerStore};
use crate::materializer::{SubcomponentMaterializer, SubcomponentRecord};
use crate::merger::InterfaceMerger;
use crate::names::FqName;
use crate::options::WeldOptions;
use crate::resolver::{ContributionResolver, MergedModules};
use crate::scanner::ClassScanner;
use crate::symbols::{Declaration, Host, Symbols};
use crate::{Error, ErrorKind, Result};

/// What a [`Compilation`] produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilationReport {
    /// Number of rounds in which new subcomponents were generated.
    pub generation_rounds: u32,
    /// Every subcomponent record, ordered by (subcomponent, parent).
    pub subcomponents: Vec<SubcomponentRecord>,
    /// Supertypes of every merge point after merging.
    pub merged_supertypes: BTreeMap<FqName, Vec<FqName>>,
    /// DI modules and bindings merged into components and module aggregators.
    pub merged_modules: BTreeMap<FqName, MergedModules>,
    /// Generated inject constructor factories.
    pub factories: Vec<FqName>,
    /// Warnings of the compilation.
    pub warnings: Vec<Warning>,
}

/// Drives one compilation over a host: scans contributions round by round, materializes
/// contributed subcomponents until a fixed point is reached and finally merges contributions into
/// every merge point.
///
/// # Examples
///
/// ```
/// use weld::names::FqName;
/// use weld::symbols::{Annotation, Declaration, MergeArguments};
/// use weld::{Compilation, Program};
///
/// let program = Program::from_sources(vec![
///     Declaration::class("kotlin.Unit").build(),
///     Declaration::interface("com.example.Foo").contributes_to("kotlin.Unit").build(),
///     Declaration::interface("com.example.AppComponent")
///         .annotate(Annotation::MergeComponent(MergeArguments::new("kotlin.Unit")))
///         .build(),
/// ])
/// .unwrap();
///
/// let report = Compilation::new(program).run().unwrap();
/// let merged = &report.merged_supertypes[&FqName::new("com.example.AppComponent")];
/// assert_eq!(merged[0].as_str(), "com.example.Foo");
/// ```
#[derive(Debug)]
pub struct Compilation<H> {
    host: H,
    markers: Box<dyn MarkerStore>,
    options: WeldOptions,
}

impl<H: Host> Compilation<H> {
    /// Creates a compilation with default options and markers kept in memory.
    pub fn new(host: H) -> Self {
        Self {
            host,
            markers: Box::new(InMemoryMarkerStore::new()),
            options: WeldOptions::default(),
        }
    }

    /// Sets the marker store shared with other compilations.
    #[must_use]
    pub fn with_markers(mut self, markers: Box<dyn MarkerStore>) -> Self {
        self.markers = markers;
        self
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: WeldOptions) -> Self {
        self.options = options;
        self
    }

    /// The host, including everything generated so far.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Consumes the compilation and returns the host.
    #[must_use]
    pub fn into_host(self) -> H {
        self.host
    }

    /// Runs the compilation to completion.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage. A [`ErrorKind::Cycle`] error is returned if
    /// subcomponents are still being generated after the configured number of rounds.
    pub fn run(&mut self) -> Result<CompilationReport> {
        let options = self.options;
        let mut report = CompilationReport::default();
        let mut round = Round::FIRST;
        let mut emitted = EmittedTypes::new(round);

        checks::detect_components(&Symbols::new(&self.host), &options)?;

        if options.generate_factories() {
            report.factories = generate_factories(&Symbols::new(&self.host), &mut emitted)?;
        }

        if options.generate_factories_only() {
            self.host.next_round(emitted.into_specs())?;
            return Ok(report);
        }

        let mut scanner = ClassScanner::new();
        let mut index = ContributionIndex::new();
        let mut materializer = SubcomponentMaterializer::new();

        loop {
            let symbols = Symbols::new(&self.host);
            scanner.refresh(&symbols, self.markers.as_mut(), &mut index, round)?;

            if round == Round::FIRST {
                report.warnings = checks::unmergeable_contributions(&symbols, &options)?;
            }

            let generated = materializer.materialize_round(&symbols, &index, round, &mut emitted)?;
            if generated > 0 {
                if round.number() > options.max_rounds() {
                    return Err(cycle_error(&index, options.max_rounds()));
                }
                report.generation_rounds += 1;
            }

            let specs = std::mem::replace(&mut emitted, EmittedTypes::new(round.next())).into_specs();
            if !specs.is_empty() {
                self.host.next_round(specs)?;
                round = round.next();
            }

            if generated == 0 {
                break;
            }
        }

        tracing::event!(
            name: "weld.fixed_point",
            tracing::Level::INFO,
            weld.round = round.number(),
            weld.generation_rounds = report.generation_rounds,
            weld.subcomponents = materializer.len(),
        );

        report.subcomponents = materializer.records().cloned().collect();

        if !options.component_merging_disabled() {
            self.merge(&index, &mut report)?;
        }

        Ok(report)
    }

    fn merge(&self, index: &ContributionIndex, report: &mut CompilationReport) -> Result<()> {
        let symbols = Symbols::new(&self.host);
        let resolver = ContributionResolver::new(symbols, index);
        let merger = InterfaceMerger::new(symbols, resolver);

        let mut merge_points: Vec<&Declaration> = symbols.source_declarations().collect();
        merge_points.sort_by(|a, b| a.id().cmp(b.id()));

        for declaration in merge_points {
            let Some(merge) = symbols.merge_annotation(declaration)? else {
                continue;
            };

            if let Some(supertypes) = merger.merged_supertypes(declaration)? {
                report.merged_supertypes.insert(declaration.fq_name(), supertypes);
            }

            if merge.kind().merges_modules() {
                report
                    .merged_modules
                    .insert(declaration.fq_name(), resolver.resolve_modules(declaration, &merge)?);
            }
        }

        Ok(())
    }
}

fn generate_factories(symbols: &Symbols<'_>, emitter: &mut dyn CodeEmitter) -> Result<Vec<FqName>> {
    let mut sources: Vec<&Declaration> = symbols.source_declarations().collect();
    sources.sort_by(|a, b| a.id().cmp(b.id()));

    let mut factories = Vec::new();
    for spec in sources.into_iter().filter_map(factory::inject_constructor_factory) {
        factories.push(emitter.emit(spec)?.id().fq_name());
    }

    Ok(factories)
}

fn cycle_error(index: &ContributionIndex, max_rounds: u32) -> Error {
    let message = match scope_cycle(index) {
        Some(cycle) => {
            let names: Vec<&str> = cycle.iter().map(FqName::as_str).collect();
            format!(
                "Contributed subcomponents did not reach a fixed point after {max_rounds} rounds. Their scopes form \
                 a cycle: {} -> {}",
                names.join(" -> "),
                names[0]
            )
        }
        None => format!("Contributed subcomponents did not reach a fixed point after {max_rounds} rounds."),
    };

    Error::new(ErrorKind::Cycle, message)
}

/// Finds a cycle in the graph of parent scope to scope edges of contributed subcomponents.
///
/// The cycle starts at its smallest scope.
fn scope_cycle(index: &ContributionIndex) -> Option<Vec<FqName>> {
    let mut graph = DiGraph::<FqName, ()>::new();
    let mut node_map: HashMap<FqName, NodeIndex> = HashMap::new();

    let mut node = |graph: &mut DiGraph<FqName, ()>, name: &FqName| {
        *node_map
            .entry(name.clone())
            .or_insert_with(|| graph.add_node(name.clone()))
    };

    for contribution in index.find_contributed(None, ContributionKind::Subcomponent) {
        if let Some(parent_scope) = contribution.parent_scope() {
            let from = node(&mut graph, parent_scope);
            let to = node(&mut graph, contribution.scope());
            graph.update_edge(from, to, ());
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.find_edge(scc[0], scc[0]).is_some())
        .filter_map(|scc| {
            let start = *scc.iter().min_by(|a, b| graph[**a].cmp(&graph[**b]))?;
            let members: HashSet<NodeIndex> = scc.into_iter().collect();
            path_back(&graph, start, &members)
        })
        .min()
}

fn path_back(graph: &DiGraph<FqName, ()>, start: NodeIndex, members: &HashSet<NodeIndex>) -> Option<Vec<FqName>> {
    let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        let mut neighbors: Vec<NodeIndex> = graph.neighbors(current).filter(|n| members.contains(n)).collect();
        neighbors.sort_by(|a, b| graph[*a].cmp(&graph[*b]));

        for next in neighbors {
            if next == start {
                let mut path = vec![graph[current].clone()];
                let mut at = current;
                while at != start {
                    at = previous[&at];
                    path.push(graph[at].clone());
                }
                path.reverse();
                return Some(path);
            }

            if let Entry::Vacant(entry) = previous.entry(next) {
                entry.insert(current);
                queue.push_back(next);
            }
        }
    }

    None
}

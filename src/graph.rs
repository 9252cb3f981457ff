//! The disassembly graph: configurations discovered during search, the moves
//! connecting them, and the accumulated disassembly plan.
//!
//! Planning runs in phases. Each phase is a bounded breadth-first search from
//! an anchor configuration that stops at the shallowest reachable "target" (a
//! configuration already missing pieces relative to the phase baseline). The
//! shortest parent chain to that target is appended to the plan and the next
//! phase starts from the target, until a single piece remains.
//!
//! Search is synchronous and single-threaded; nodes are never removed once
//! discovered, so config IDs stay valid for the graph's lifetime.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use log::{error, info, warn};
use rand::Rng;
use rustc_hash::FxHashSet;

use crate::config::Config;
use crate::persistence::{self, PuzzleFileError};

/// Safety bound on nodes discovered within one search phase: a runaway phase
/// terminates instead of exploring the whole reachable space. Each phase gets
/// the full budget; earlier phases never eat into it.
pub const DEFAULT_NODE_CAP: usize = 100;

/// How a kernel search phase ended.
///
/// `Unreachable` (queue drained, no target) and `Aborted` (node cap tripped
/// before any target) are deliberately distinct: only the former is evidence
/// that no disassembling move exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelOutcome {
    Found { target: usize, depth: i32 },
    Unreachable,
    Aborted,
}

pub struct DisassemblyGraph {
    nodes: Vec<Config>,
    edges: Vec<FxHashSet<usize>>,
    parents: Vec<Option<usize>>,
    plan: Vec<usize>,
    min_target_depth: Option<i32>,
    built: bool,
    prev_target: Option<usize>,
    node_cap: usize,
}

impl Default for DisassemblyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DisassemblyGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            parents: Vec::new(),
            plan: Vec::new(),
            min_target_depth: None,
            built: false,
            prev_target: None,
            node_cap: DEFAULT_NODE_CAP,
        }
    }

    pub fn set_node_cap(&mut self, cap: usize) {
        self.node_cap = cap;
    }

    /// Imports a puzzle file as configuration #0. All previous graph state is
    /// cleared first, so a failed import leaves an empty graph.
    pub fn import_puzzle(
        &mut self,
        path: &Path,
        rng: &mut impl Rng,
    ) -> Result<(), PuzzleFileError> {
        self.reset();
        let pieces = persistence::load_puzzle(path)?;
        self.install_root(Config::from_pieces(pieces), rng);
        Ok(())
    }

    /// Same as [`import_puzzle`](Self::import_puzzle) but from an in-memory
    /// source string.
    pub fn import_puzzle_source(
        &mut self,
        source: &str,
        rng: &mut impl Rng,
    ) -> Result<(), PuzzleFileError> {
        self.reset();
        let pieces = persistence::parse_puzzle(source)?;
        self.install_root(Config::from_pieces(pieces), rng);
        Ok(())
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.parents.clear();
        self.plan.clear();
        self.min_target_depth = None;
        self.built = false;
        self.prev_target = None;
    }

    fn install_root(&mut self, mut root: Config, rng: &mut impl Rng) {
        root.assign_piece_materials(rng);
        info!("imported puzzle with {} pieces", root.piece_count());
        self.nodes.push(root);
        self.edges.push(FxHashSet::default());
        self.parents.push(None);
    }

    /// One bounded breadth-first search phase from `start`.
    ///
    /// Targets are recorded at `depth - relative_depth`; once a target is seen
    /// at relative depth D no configuration at relative depth >= D is expanded
    /// further (a shorter move already exists). New configurations are
    /// deduplicated against every node discovered so far by the linear
    /// `is_equal_to` scan; a rediscovered configuration only gains an edge.
    /// On success the shallowest target's parent chain is appended to the plan.
    pub fn build_kernel_disassembly_graph(
        &mut self,
        start: usize,
        relative_depth: i32,
        full_config_delta: usize,
    ) -> KernelOutcome {
        if self.nodes.is_empty() {
            error!("no puzzle to disassemble; import one first");
            return KernelOutcome::Unreachable;
        }

        let mut targets: BTreeMap<i32, usize> = BTreeMap::new();
        let mut phase_min_depth = i32::MAX;
        let mut visited: FxHashSet<usize> = FxHashSet::default();
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut discovered = 0;
        let mut capped = false;

        queue.push_back(start);

        while let Some(front) = queue.pop_front() {
            if !visited.insert(front) {
                continue;
            }

            let depth = self.nodes[front].depth() - relative_depth;

            if !self.nodes[front].is_full_config(full_config_delta) {
                // first configuration seen at this depth wins
                targets.entry(depth).or_insert(front);
                phase_min_depth = phase_min_depth.min(depth);
                continue;
            }

            if depth >= phase_min_depth {
                continue;
            }

            for neighbor in self.nodes[front].neighbor_configs() {
                match self.nodes.iter().position(|node| neighbor.is_equal_to(node)) {
                    Some(existing) => {
                        self.edges[existing].insert(front);
                        self.edges[front].insert(existing);
                    }
                    None => {
                        let id = self.nodes.len();
                        self.nodes.push(neighbor);
                        self.edges.push(FxHashSet::default());
                        self.parents.push(Some(front));
                        self.edges[id].insert(front);
                        self.edges[front].insert(id);
                        queue.push_back(id);
                        discovered += 1;
                    }
                }
            }

            if discovered > self.node_cap {
                capped = true;
                break;
            }
        }

        match targets.first_key_value() {
            Some((&depth, &target)) => {
                self.append_plan_segment(start, target);
                self.prev_target = Some(target);
                self.min_target_depth =
                    Some(self.min_target_depth.map_or(depth, |d| d.min(depth)));
                self.built = true;
                info!(
                    "kernel phase from config #{start}: target #{target} at depth {depth} \
                     ({} configs discovered)",
                    self.nodes.len()
                );
                KernelOutcome::Found { target, depth }
            }
            None if capped => {
                error!(
                    "kernel phase from config #{start} aborted: node cap {} reached \
                     before any target",
                    self.node_cap
                );
                KernelOutcome::Aborted
            }
            None => {
                warn!("kernel phase from config #{start}: no removable subassembly reachable");
                KernelOutcome::Unreachable
            }
        }
    }

    /// Walks the parent chain from `target` back to `start`, reverses it and
    /// appends it to the plan, without duplicating the previous phase anchor.
    fn append_plan_segment(&mut self, start: usize, target: usize) {
        let mut segment = vec![target];
        let mut cur = target;
        while cur != start {
            match self.parents[cur] {
                Some(parent) => {
                    cur = parent;
                    segment.push(cur);
                }
                None => break,
            }
        }
        segment.reverse();

        if self.plan.last() == Some(&start) {
            self.plan.extend(segment.into_iter().skip(1));
        } else {
            self.plan.extend(segment);
        }
    }

    /// Repeats kernel phases, each anchored at the previous phase's target,
    /// until the active configuration holds a single piece or a phase fails.
    pub fn build_complete_disassembly_graph(&mut self) {
        if self.nodes.is_empty() {
            error!("no puzzle to disassemble; import one first");
            return;
        }

        loop {
            let anchor = self.prev_target.unwrap_or(0);
            if self.nodes[anchor].piece_count() == 1 {
                self.built = true;
                info!(
                    "complete disassembly: {} plan steps over {} configs",
                    self.plan.len(),
                    self.nodes.len()
                );
                return;
            }

            let relative_depth = self.nodes[anchor].depth();
            let delta = self.nodes[anchor].removed_piece_count();
            match self.build_kernel_disassembly_graph(anchor, relative_depth, delta) {
                KernelOutcome::Found { .. } => {}
                KernelOutcome::Unreachable => {
                    error!("no disassembling move exists from config #{anchor}");
                    return;
                }
                KernelOutcome::Aborted => {
                    error!("search from config #{anchor} gave up before finding a move");
                    return;
                }
            }
        }
    }

    pub fn config(&self, id: usize) -> &Config {
        &self.nodes[id]
    }

    pub fn config_count(&self) -> usize {
        self.nodes.len()
    }

    /// Config IDs one move apart from `id`; introspection only, the search
    /// itself never reads this.
    pub fn edges(&self, id: usize) -> &FxHashSet<usize> {
        &self.edges[id]
    }

    pub fn plan_config_id(&self, offset: usize) -> usize {
        self.plan[offset]
    }

    pub fn plan_len(&self) -> usize {
        self.plan.len()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Shallowest target depth found over all phases: the cost of the
    /// cheapest single disassembly move, a proxy for puzzle difficulty.
    pub fn difficulty(&self) -> Option<i32> {
        self.min_target_depth
    }

    /// ASCII rendering of every plan step, in order.
    pub fn format_plan(&self) -> String {
        let mut out = String::new();
        for (step, &id) in self.plan.iter().enumerate() {
            if step > 0 {
                out.push_str("\n\n");
            }
            out.push_str(&format!("step {step}:\n{}", self.nodes[id].format_grid()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::PUZZLE_MAGIC;
    use crate::pieces::{DOUBLE_POCKET, POCKET, TRIPLE_BAR};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn imported(source: &str) -> DisassemblyGraph {
        let mut graph = DisassemblyGraph::new();
        let mut rng = StdRng::seed_from_u64(0);
        graph.import_puzzle_source(source, &mut rng).unwrap();
        graph
    }

    #[test]
    fn test_import_twice_yields_equal_roots() {
        let a = imported(POCKET);
        let b = imported(POCKET);
        assert!(a.config(0).is_equal_to(b.config(0)));
    }

    #[test]
    fn test_failed_import_leaves_graph_empty() {
        let mut graph = imported(POCKET);
        let mut rng = StdRng::seed_from_u64(0);
        let result = graph.import_puzzle_source("1234 broken", &mut rng);
        assert!(result.is_err());
        assert_eq!(graph.config_count(), 0);
        assert!(!graph.is_built());
    }

    #[test]
    fn test_import_rejects_piece_without_voxels() {
        let mut graph = DisassemblyGraph::new();
        let mut rng = StdRng::seed_from_u64(0);
        let source = format!("{PUZZLE_MAGIC}\n1\n0\n");
        assert!(graph.import_puzzle_source(&source, &mut rng).is_err());
        assert_eq!(graph.config_count(), 0);
    }

    #[test]
    fn test_kernel_finds_depth_two_target_in_pocket() {
        let mut graph = imported(POCKET);
        let outcome = graph.build_kernel_disassembly_graph(0, 0, 0);
        match outcome {
            KernelOutcome::Found { target, depth } => {
                assert_eq!(depth, 2);
                assert_eq!(graph.config(target).piece_count(), 1);
            }
            other => panic!("expected Found, got {other:?}"),
        }
        assert!(graph.is_built());
        assert_eq!(graph.plan_len(), 3);
        assert_eq!(graph.plan_config_id(0), 0);
    }

    #[test]
    fn test_kernel_dedup_keeps_nodes_pairwise_distinct() {
        let mut graph = imported(POCKET);
        graph.build_kernel_disassembly_graph(0, 0, 0);

        let n = graph.config_count();
        for i in 0..n {
            for j in (i + 1)..n {
                assert!(
                    !graph.config(i).is_equal_to(graph.config(j)),
                    "configs #{i} and #{j} are duplicates"
                );
            }
        }
    }

    #[test]
    fn test_kernel_edges_are_symmetric() {
        let mut graph = imported(POCKET);
        graph.build_kernel_disassembly_graph(0, 0, 0);

        for id in 0..graph.config_count() {
            for &other in graph.edges(id) {
                assert!(graph.edges(other).contains(&id));
            }
        }
    }

    #[test]
    fn test_kernel_on_single_piece_is_unreachable() {
        let source = format!("{PUZZLE_MAGIC}\n1\n2\n0 0\n1 0\n");
        let mut graph = imported(&source);
        assert_eq!(
            graph.build_kernel_disassembly_graph(0, 0, 0),
            KernelOutcome::Unreachable
        );
        assert!(!graph.is_built());
    }

    #[test]
    fn test_node_cap_aborts_before_target() {
        let mut graph = imported(POCKET);
        graph.set_node_cap(1);
        assert_eq!(
            graph.build_kernel_disassembly_graph(0, 0, 0),
            KernelOutcome::Aborted
        );
        assert!(!graph.is_built());
        assert_eq!(graph.plan_len(), 0);
    }

    #[test]
    fn test_node_cap_budget_renews_every_phase() {
        // each of the two phases discovers exactly one config, so a per-phase
        // cap of 1 must carry the search all the way through
        let mut graph = imported(TRIPLE_BAR);
        graph.set_node_cap(1);
        graph.build_complete_disassembly_graph();

        assert!(graph.is_built());
        let last = graph.plan_config_id(graph.plan_len() - 1);
        assert_eq!(graph.config(last).piece_count(), 1);
    }

    #[test]
    fn test_complete_disassembly_of_triple_bar() {
        let mut graph = imported(TRIPLE_BAR);
        graph.build_complete_disassembly_graph();

        assert!(graph.is_built());
        let last = graph.plan_config_id(graph.plan_len() - 1);
        assert_eq!(graph.config(last).piece_count(), 1);
        assert_eq!(graph.difficulty(), Some(1));
    }

    #[test]
    fn test_complete_disassembly_of_pocket() {
        let mut graph = imported(POCKET);
        graph.build_complete_disassembly_graph();

        assert!(graph.is_built());
        assert_eq!(graph.plan_len(), 3);
        let last = graph.plan_config_id(graph.plan_len() - 1);
        assert_eq!(graph.config(last).piece_count(), 1);
        assert_eq!(graph.difficulty(), Some(2));
    }

    #[test]
    fn test_complete_disassembly_of_double_pocket_terminates() {
        let mut graph = imported(DOUBLE_POCKET);
        graph.build_complete_disassembly_graph();

        // either fully disassembled or stopped by the node cap, never hung
        if graph.is_built() {
            let last = graph.plan_config_id(graph.plan_len() - 1);
            assert_eq!(graph.config(last).piece_count(), 1);
        }
        assert!(graph.config_count() <= 3 * DEFAULT_NODE_CAP);
    }

    #[test]
    fn test_plan_depths_increase_within_phase() {
        let mut graph = imported(POCKET);
        graph.build_kernel_disassembly_graph(0, 0, 0);

        for offset in 1..graph.plan_len() {
            let prev = graph.config(graph.plan_config_id(offset - 1)).depth();
            let cur = graph.config(graph.plan_config_id(offset)).depth();
            assert_eq!(cur, prev + 1);
        }
    }

    #[test]
    fn test_complete_on_empty_graph_is_a_no_op() {
        let mut graph = DisassemblyGraph::new();
        graph.build_complete_disassembly_graph();
        assert!(!graph.is_built());
        assert_eq!(graph.plan_len(), 0);
    }
}

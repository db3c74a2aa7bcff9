use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A named slot of the session state that takes part in invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Node {
    Upload,
    Headers,
    Mapping,
    Filters,
    RiskFreeRate,
    InitialCapital,
    BenchmarkTicker,
    ProcessedData,
    FilteredData,
    Benchmark,
    Kpis,
    ConfidenceIntervals,
    Drawdown,
}

impl Node {
    /// Every node in topological order: dependencies come before dependents.
    pub const ALL: [Node; 13] = [
        Node::Upload,
        Node::Headers,
        Node::Mapping,
        Node::Filters,
        Node::RiskFreeRate,
        Node::InitialCapital,
        Node::BenchmarkTicker,
        Node::ProcessedData,
        Node::FilteredData,
        Node::Benchmark,
        Node::Kpis,
        Node::ConfidenceIntervals,
        Node::Drawdown,
    ];

    /// The nodes this node's value is derived from.
    pub fn dependencies(self) -> &'static [Node] {
        match self {
            Node::Upload
            | Node::Filters
            | Node::RiskFreeRate
            | Node::InitialCapital
            | Node::BenchmarkTicker => &[],
            Node::Headers => &[Node::Upload],
            Node::Mapping => &[Node::Headers],
            Node::ProcessedData => &[Node::Upload, Node::Mapping],
            Node::FilteredData => &[Node::ProcessedData, Node::Filters],
            Node::Benchmark => &[Node::FilteredData, Node::BenchmarkTicker],
            Node::Kpis => &[
                Node::FilteredData,
                Node::Benchmark,
                Node::RiskFreeRate,
                Node::InitialCapital,
            ],
            Node::ConfidenceIntervals | Node::Drawdown => &[Node::FilteredData],
        }
    }

    /// Nodes that list `self` as a direct dependency.
    pub fn dependents(self) -> impl Iterator<Item = Node> {
        Node::ALL
            .into_iter()
            .filter(move |n| n.dependencies().contains(&self))
    }

    fn position(self) -> usize {
        Node::ALL.iter().position(|n| *n == self).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Node::Upload => "upload",
            Node::Headers => "headers",
            Node::Mapping => "mapping",
            Node::Filters => "filters",
            Node::RiskFreeRate => "risk_free_rate",
            Node::InitialCapital => "initial_capital",
            Node::BenchmarkTicker => "benchmark_ticker",
            Node::ProcessedData => "processed_data",
            Node::FilteredData => "filtered_data",
            Node::Benchmark => "benchmark",
            Node::Kpis => "kpis",
            Node::ConfidenceIntervals => "confidence_intervals",
            Node::Drawdown => "drawdown",
        };
        f.write_str(name)
    }
}

/// Version bookkeeping for the session's nodes.
///
/// Every node carries a counter that increases whenever its value changes.
/// A derived node remembers the counters of its dependencies at the time it
/// was computed and is stale as soon as any of them moves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    versions: BTreeMap<Node, u64>,
    computed_from: BTreeMap<Node, Vec<u64>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self, node: Node) -> u64 {
        self.versions.get(&node).copied().unwrap_or_default()
    }

    fn dependency_versions(&self, node: Node) -> Vec<u64> {
        node.dependencies().iter().map(|d| self.version(*d)).collect()
    }

    /// True when `node` was never computed, was invalidated, or any of its
    /// dependencies changed since it was computed.
    pub fn is_stale(&self, node: Node) -> bool {
        self.computed_from.get(&node) != Some(&self.dependency_versions(node))
    }

    /// Records a new value for an input node. Returns the dependents that
    /// were invalidated, in topological order.
    pub fn set_input(&mut self, node: Node) -> Vec<Node> {
        self.bump(node);
        self.invalidate(node)
    }

    /// Records that `node` was recomputed from the current dependency
    /// versions. Its own version moves, so every dependent is invalidated.
    pub fn mark_computed(&mut self, node: Node) -> Vec<Node> {
        let versions = self.dependency_versions(node);
        self.computed_from.insert(node, versions);
        self.bump(node);
        self.invalidate(node)
    }

    /// Drops the record of `node`'s last computation so it is recomputed on
    /// the next evaluation.
    pub fn forget(&mut self, node: Node) {
        self.computed_from.remove(&node);
    }

    /// Invalidates every transitive dependent of `node` and returns them in
    /// topological order. `node` itself is untouched.
    pub fn invalidate(&mut self, node: Node) -> Vec<Node> {
        let affected = Self::transitive_dependents(node);
        for dependent in &affected {
            self.computed_from.remove(dependent);
            self.bump(*dependent);
        }
        affected
    }

    pub fn transitive_dependents(node: Node) -> Vec<Node> {
        let mut found: Vec<Node> = Vec::new();
        let mut frontier = vec![node];
        while let Some(current) = frontier.pop() {
            for dependent in current.dependents() {
                if !found.contains(&dependent) {
                    found.push(dependent);
                    frontier.push(dependent);
                }
            }
        }
        found.sort_by_key(|n| n.position());
        found
    }

    fn bump(&mut self, node: Node) {
        *self.versions.entry(node).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_topologically_ordered() {
        for node in Node::ALL {
            for dependency in node.dependencies() {
                assert!(dependency.position() < node.position(), "{dependency} before {node}");
            }
        }
    }

    #[test]
    fn upload_cascades_to_every_data_node() {
        let affected = DependencyGraph::transitive_dependents(Node::Upload);
        assert_eq!(
            affected,
            vec![
                Node::Headers,
                Node::Mapping,
                Node::ProcessedData,
                Node::FilteredData,
                Node::Benchmark,
                Node::Kpis,
                Node::ConfidenceIntervals,
                Node::Drawdown,
            ]
        );
    }

    #[test]
    fn parameters_only_reach_kpis() {
        assert_eq!(DependencyGraph::transitive_dependents(Node::RiskFreeRate), vec![Node::Kpis]);
        assert_eq!(DependencyGraph::transitive_dependents(Node::InitialCapital), vec![Node::Kpis]);
        assert_eq!(
            DependencyGraph::transitive_dependents(Node::BenchmarkTicker),
            vec![Node::Benchmark, Node::Kpis]
        );
    }

    #[test]
    fn computed_node_is_fresh_until_a_dependency_moves() {
        let mut graph = DependencyGraph::new();
        assert!(graph.is_stale(Node::Kpis));

        graph.mark_computed(Node::Kpis);
        assert!(!graph.is_stale(Node::Kpis));

        let invalidated = graph.set_input(Node::RiskFreeRate);
        assert_eq!(invalidated, vec![Node::Kpis]);
        assert!(graph.is_stale(Node::Kpis));
    }

    #[test]
    fn recompute_invalidates_every_dependent() {
        let mut graph = DependencyGraph::new();
        graph.mark_computed(Node::FilteredData);
        graph.mark_computed(Node::Benchmark);
        graph.mark_computed(Node::Kpis);
        graph.mark_computed(Node::Drawdown);
        assert!(!graph.is_stale(Node::Kpis));

        graph.forget(Node::FilteredData);
        let invalidated = graph.mark_computed(Node::FilteredData);

        assert_eq!(
            invalidated,
            vec![Node::Benchmark, Node::Kpis, Node::ConfidenceIntervals, Node::Drawdown]
        );
        assert!(!graph.is_stale(Node::FilteredData));
        assert!(graph.is_stale(Node::Kpis));
        assert!(graph.is_stale(Node::Drawdown));
    }

    #[test]
    fn versions_only_increase() {
        let mut graph = DependencyGraph::new();
        let before = graph.version(Node::FilteredData);
        graph.set_input(Node::Filters);
        graph.set_input(Node::Filters);
        assert_eq!(graph.version(Node::Filters), 2);
        assert_eq!(graph.version(Node::FilteredData), before + 2);
    }
}

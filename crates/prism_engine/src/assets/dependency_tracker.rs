//! Resource dependency tracker
//!
//! Directed graph over named resources. Edges point from a resource to the
//! resources it needs (a material to its shader and textures). Dependencies
//! may name resources that are not registered yet; such names act as leaves
//! until they appear. One mutex serializes every operation, so the public
//! surface is thread-safe.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Mutex;

use thiserror::Error;

use super::ResourceKind;

/// Dependency tracker errors
#[derive(Debug, Error)]
pub enum DependencyError {
    /// Operation referenced a name that is not registered
    #[error("Resource not registered: {0}")]
    NotFound(String),
}

/// Aggregate counters over the graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStatistics {
    /// Registered resources
    pub resources: usize,
    /// Dependency edges
    pub edges: usize,
    /// Resources nothing depends on
    pub roots: usize,
    /// Resources with no dependencies
    pub leaves: usize,
    /// Distinct cycles currently in the graph
    pub cycles: usize,
}

#[derive(Debug)]
struct Node {
    kind: ResourceKind,
    dependencies: Vec<String>,
    ref_count: u32,
}

#[derive(Debug, Default)]
struct Graph {
    nodes: HashMap<String, Node>,
}

/// Thread-safe dependency graph over named resources
#[derive(Debug, Default)]
pub struct DependencyTracker {
    graph: Mutex<Graph>,
}

/// DFS coloring for cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl DependencyTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource node
    ///
    /// Re-registering an existing name keeps its edges and reference count
    /// and updates the kind.
    pub fn register(&self, name: &str, kind: ResourceKind) {
        let mut graph = self.graph.lock().unwrap();
        if let Some(node) = graph.nodes.get_mut(name) {
            if node.kind != kind {
                log::warn!(
                    "Resource '{}' re-registered as {} (was {})",
                    name,
                    kind,
                    node.kind
                );
                node.kind = kind;
            }
            return;
        }
        graph.nodes.insert(
            name.to_string(),
            Node {
                kind,
                dependencies: Vec::new(),
                ref_count: 0,
            },
        );
        log::trace!("Registered {} '{}'", kind, name);
    }

    /// Remove a resource node and its outgoing edges
    ///
    /// Unregistering an unknown name is a no-op. Incoming edges from other
    /// resources are left in place and treat the name as an unregistered
    /// leaf from then on.
    pub fn unregister(&self, name: &str) {
        let mut graph = self.graph.lock().unwrap();
        match graph.nodes.remove(name) {
            Some(node) if node.ref_count > 0 => {
                log::warn!(
                    "Unregistered '{}' while {} references were outstanding",
                    name,
                    node.ref_count
                );
            }
            Some(_) => log::trace!("Unregistered '{}'", name),
            None => {}
        }
    }

    /// Whether a name is registered
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.graph.lock().unwrap().nodes.contains_key(name)
    }

    /// Kind of a registered resource
    #[must_use]
    pub fn kind(&self, name: &str) -> Option<ResourceKind> {
        self.graph.lock().unwrap().nodes.get(name).map(|n| n.kind)
    }

    /// Add one dependency edge
    ///
    /// # Errors
    /// Returns [`DependencyError::NotFound`] when `name` is not registered.
    /// The dependency itself does not have to be registered.
    pub fn add_dependency(&self, name: &str, dependency: &str) -> Result<(), DependencyError> {
        let mut graph = self.graph.lock().unwrap();
        let node = graph
            .nodes
            .get_mut(name)
            .ok_or_else(|| DependencyError::NotFound(name.to_string()))?;
        if !node.dependencies.iter().any(|d| d == dependency) {
            node.dependencies.push(dependency.to_string());
        }
        Ok(())
    }

    /// Remove one dependency edge; removing an absent edge is a no-op
    ///
    /// # Errors
    /// Returns [`DependencyError::NotFound`] when `name` is not registered.
    pub fn remove_dependency(&self, name: &str, dependency: &str) -> Result<(), DependencyError> {
        let mut graph = self.graph.lock().unwrap();
        let node = graph
            .nodes
            .get_mut(name)
            .ok_or_else(|| DependencyError::NotFound(name.to_string()))?;
        node.dependencies.retain(|d| d != dependency);
        Ok(())
    }

    /// Replace the whole outgoing edge set of a resource
    ///
    /// # Errors
    /// Returns [`DependencyError::NotFound`] when `name` is not registered.
    pub fn set_dependencies(
        &self,
        name: &str,
        dependencies: &[String],
    ) -> Result<(), DependencyError> {
        let mut graph = self.graph.lock().unwrap();
        let node = graph
            .nodes
            .get_mut(name)
            .ok_or_else(|| DependencyError::NotFound(name.to_string()))?;
        let mut seen = HashSet::new();
        node.dependencies = dependencies
            .iter()
            .filter(|d| seen.insert(d.as_str()))
            .cloned()
            .collect();
        Ok(())
    }

    /// Direct dependencies of a resource
    #[must_use]
    pub fn get_dependencies(&self, name: &str) -> Vec<String> {
        self.graph
            .lock()
            .unwrap()
            .nodes
            .get(name)
            .map(|n| n.dependencies.clone())
            .unwrap_or_default()
    }

    /// Resources that directly depend on `name` (reverse lookup)
    #[must_use]
    pub fn get_dependents(&self, name: &str) -> Vec<String> {
        let graph = self.graph.lock().unwrap();
        let mut dependents: Vec<String> = graph
            .nodes
            .iter()
            .filter(|(_, node)| node.dependencies.iter().any(|d| d == name))
            .map(|(owner, _)| owner.clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// Whether any cycle is reachable from `name`
    #[must_use]
    pub fn has_cycle(&self, name: &str) -> bool {
        self.detect_cycle(name).is_some()
    }

    /// Find one cycle reachable from `name`
    ///
    /// The returned path starts and ends on the same resource.
    #[must_use]
    pub fn detect_cycle(&self, name: &str) -> Option<Vec<String>> {
        let graph = self.graph.lock().unwrap();
        let mut colors = HashMap::new();
        let mut stack = Vec::new();
        let mut cycles = Vec::new();
        Self::dfs_cycles(&graph, name, &mut colors, &mut stack, &mut cycles, true);
        cycles.into_iter().next()
    }

    /// Find every distinct cycle in the graph
    #[must_use]
    pub fn detect_all_cycles(&self) -> Vec<Vec<String>> {
        let graph = self.graph.lock().unwrap();
        Self::all_cycles(&graph)
    }

    fn all_cycles(graph: &Graph) -> Vec<Vec<String>> {
        let mut colors = HashMap::new();
        let mut cycles = Vec::new();
        let mut names: Vec<&String> = graph.nodes.keys().collect();
        names.sort();
        for name in names {
            if colors.get(name.as_str()).copied().unwrap_or(Color::White) == Color::White {
                let mut stack = Vec::new();
                Self::dfs_cycles(graph, name, &mut colors, &mut stack, &mut cycles, false);
            }
        }
        cycles
    }

    /// Tri-color DFS. A gray hit records the path from the gray node back to
    /// itself as one cycle and the walk continues. When `first_only` is set
    /// the walk stops after the first recorded cycle.
    fn dfs_cycles(
        graph: &Graph,
        name: &str,
        colors: &mut HashMap<String, Color>,
        stack: &mut Vec<String>,
        cycles: &mut Vec<Vec<String>>,
        first_only: bool,
    ) {
        let Some(node) = graph.nodes.get(name) else {
            return;
        };
        colors.insert(name.to_string(), Color::Gray);
        stack.push(name.to_string());
        for dep in &node.dependencies {
            match colors.get(dep.as_str()).copied().unwrap_or(Color::White) {
                Color::Gray => {
                    if let Some(start) = stack.iter().position(|n| n == dep) {
                        let mut cycle: Vec<String> = stack[start..].to_vec();
                        cycle.push(dep.clone());
                        cycles.push(cycle);
                    }
                    if first_only {
                        stack.pop();
                        colors.insert(name.to_string(), Color::Black);
                        return;
                    }
                }
                Color::White => {
                    Self::dfs_cycles(graph, dep, colors, stack, cycles, first_only);
                    if first_only && !cycles.is_empty() {
                        stack.pop();
                        colors.insert(name.to_string(), Color::Black);
                        return;
                    }
                }
                Color::Black => {}
            }
        }
        stack.pop();
        colors.insert(name.to_string(), Color::Black);
    }

    /// Longest path from `name` to a leaf
    ///
    /// Unregistered dependency names count as leaves. Back-edges contribute
    /// zero so the value stays defined in the presence of cycles. An
    /// unregistered `name` has depth zero.
    #[must_use]
    pub fn depth(&self, name: &str) -> usize {
        let graph = self.graph.lock().unwrap();
        let mut memo = HashMap::new();
        let mut on_stack = HashSet::new();
        Self::depth_of(&graph, name, &mut memo, &mut on_stack)
    }

    fn depth_of(
        graph: &Graph,
        name: &str,
        memo: &mut HashMap<String, usize>,
        on_stack: &mut HashSet<String>,
    ) -> usize {
        if let Some(&cached) = memo.get(name) {
            return cached;
        }
        let Some(node) = graph.nodes.get(name) else {
            return 0;
        };
        on_stack.insert(name.to_string());
        let mut best = 0;
        for dep in &node.dependencies {
            if on_stack.contains(dep.as_str()) {
                continue;
            }
            best = best.max(1 + Self::depth_of(graph, dep, memo, on_stack));
        }
        on_stack.remove(name);
        memo.insert(name.to_string(), best);
        best
    }

    /// Every resource reachable from `name` through dependency edges
    ///
    /// The result excludes `name` itself and is sorted.
    #[must_use]
    pub fn recursive_closure(&self, name: &str) -> Vec<String> {
        let graph = self.graph.lock().unwrap();
        let mut seen = HashSet::new();
        let mut queue = vec![name.to_string()];
        while let Some(current) = queue.pop() {
            if let Some(node) = graph.nodes.get(&current) {
                for dep in &node.dependencies {
                    if seen.insert(dep.clone()) {
                        queue.push(dep.clone());
                    }
                }
            }
        }
        seen.remove(name);
        let mut closure: Vec<String> = seen.into_iter().collect();
        closure.sort();
        closure
    }

    /// Render the graph in Graphviz DOT format
    #[must_use]
    pub fn export_dot(&self) -> String {
        let graph = self.graph.lock().unwrap();
        let mut out = String::from("digraph dependencies {\n");
        let mut names: Vec<&String> = graph.nodes.keys().collect();
        names.sort();
        for name in &names {
            let node = &graph.nodes[*name];
            let _ = writeln!(out, "    \"{}\" [label=\"{}\\n({})\"];", name, name, node.kind);
        }
        for name in &names {
            for dep in &graph.nodes[*name].dependencies {
                let _ = writeln!(out, "    \"{name}\" -> \"{dep}\";");
            }
        }
        out.push_str("}\n");
        out
    }

    /// Render the dependency tree rooted at `name` as indented text
    ///
    /// Recursion stops at `max_depth` levels below the root. Already-visited
    /// resources on the current path print a cycle marker instead of
    /// recursing.
    #[must_use]
    pub fn format_tree(&self, name: &str, max_depth: usize) -> String {
        let graph = self.graph.lock().unwrap();
        let mut out = String::new();
        let mut path = HashSet::new();
        Self::format_node(&graph, name, 0, max_depth, &mut path, &mut out);
        out
    }

    fn format_node(
        graph: &Graph,
        name: &str,
        level: usize,
        max_depth: usize,
        path: &mut HashSet<String>,
        out: &mut String,
    ) {
        let indent = "  ".repeat(level);
        match graph.nodes.get(name) {
            None => {
                let _ = writeln!(out, "{indent}{name} (unregistered)");
            }
            Some(_) if path.contains(name) => {
                let _ = writeln!(out, "{indent}{name} (cycle)");
            }
            Some(node) => {
                let _ = writeln!(out, "{indent}{name} ({})", node.kind);
                if level < max_depth {
                    path.insert(name.to_string());
                    for dep in &node.dependencies {
                        Self::format_node(graph, dep, level + 1, max_depth, path, out);
                    }
                    path.remove(name);
                }
            }
        }
    }

    /// Aggregate counters over the current graph
    #[must_use]
    pub fn statistics(&self) -> TrackerStatistics {
        let graph = self.graph.lock().unwrap();
        let mut depended_on = HashSet::new();
        let mut edges = 0;
        let mut leaves = 0;
        for node in graph.nodes.values() {
            edges += node.dependencies.len();
            if node.dependencies.is_empty() {
                leaves += 1;
            }
            for dep in &node.dependencies {
                depended_on.insert(dep.as_str());
            }
        }
        let roots = graph
            .nodes
            .keys()
            .filter(|name| !depended_on.contains(name.as_str()))
            .count();
        TrackerStatistics {
            resources: graph.nodes.len(),
            edges,
            roots,
            leaves,
            cycles: Self::all_cycles(&graph).len(),
        }
    }

    /// Increment the reference count of a resource
    ///
    /// # Errors
    /// Returns [`DependencyError::NotFound`] when `name` is not registered.
    pub fn add_ref(&self, name: &str) -> Result<u32, DependencyError> {
        let mut graph = self.graph.lock().unwrap();
        let node = graph
            .nodes
            .get_mut(name)
            .ok_or_else(|| DependencyError::NotFound(name.to_string()))?;
        node.ref_count += 1;
        Ok(node.ref_count)
    }

    /// Decrement the reference count of a resource, saturating at zero
    ///
    /// # Errors
    /// Returns [`DependencyError::NotFound`] when `name` is not registered.
    pub fn release(&self, name: &str) -> Result<u32, DependencyError> {
        let mut graph = self.graph.lock().unwrap();
        let node = graph
            .nodes
            .get_mut(name)
            .ok_or_else(|| DependencyError::NotFound(name.to_string()))?;
        if node.ref_count == 0 {
            log::warn!("Released '{}' with a zero reference count", name);
        } else {
            node.ref_count -= 1;
        }
        Ok(node.ref_count)
    }

    /// Current reference count, or `None` when unregistered
    #[must_use]
    pub fn ref_count(&self, name: &str) -> Option<u32> {
        self.graph
            .lock()
            .unwrap()
            .nodes
            .get(name)
            .map(|n| n.ref_count)
    }

    /// Drop every node and edge
    pub fn clear(&self) {
        self.graph.lock().unwrap().nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(edges: &[(&str, &str)]) -> DependencyTracker {
        let tracker = DependencyTracker::new();
        for (from, to) in edges {
            tracker.register(from, ResourceKind::Material);
            tracker.register(to, ResourceKind::Texture);
            tracker.add_dependency(from, to).unwrap();
        }
        tracker
    }

    #[test]
    fn two_node_cycle_is_detected() {
        let tracker = tracker_with(&[("a", "b"), ("b", "a")]);
        assert!(tracker.has_cycle("a"));
        let cycle = tracker.detect_cycle("a").unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 3);
    }

    #[test]
    fn triangle_cycle_path_closes() {
        let tracker = tracker_with(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycle = tracker.detect_cycle("a").unwrap();
        assert_eq!(cycle.len(), 4);
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(tracker.detect_all_cycles().len(), 1);
    }

    #[test]
    fn acyclic_graph_reports_no_cycles() {
        let tracker = tracker_with(&[("model", "material"), ("material", "texture")]);
        assert!(!tracker.has_cycle("model"));
        assert!(tracker.detect_all_cycles().is_empty());
    }

    #[test]
    fn depth_is_longest_path_to_leaf() {
        let tracker = DependencyTracker::new();
        for name in ["material", "shader", "t1", "t2", "base_shader", "base_tex"] {
            tracker.register(name, ResourceKind::Texture);
        }
        tracker
            .set_dependencies(
                "material",
                &["shader".into(), "t1".into(), "t2".into()],
            )
            .unwrap();
        tracker
            .set_dependencies("shader", &["base_shader".into()])
            .unwrap();
        tracker.set_dependencies("t1", &["base_tex".into()]).unwrap();
        tracker.set_dependencies("t2", &["base_tex".into()]).unwrap();

        assert_eq!(tracker.depth("material"), 2);
        assert_eq!(tracker.depth("shader"), 1);
        assert_eq!(tracker.depth("base_tex"), 0);
    }

    #[test]
    fn depth_ignores_back_edges() {
        let tracker = tracker_with(&[("a", "b"), ("b", "a")]);
        // The cycle contributes nothing beyond the forward edge.
        assert_eq!(tracker.depth("a"), 1);
    }

    #[test]
    fn unregistered_dependency_acts_as_leaf() {
        let tracker = DependencyTracker::new();
        tracker.register("material", ResourceKind::Material);
        tracker.add_dependency("material", "ghost_texture").unwrap();
        assert_eq!(tracker.depth("material"), 1);
        assert_eq!(tracker.get_dependencies("material"), vec!["ghost_texture"]);
    }

    #[test]
    fn dependents_mirror_dependencies() {
        let tracker = tracker_with(&[("m1", "tex"), ("m2", "tex")]);
        assert_eq!(tracker.get_dependents("tex"), vec!["m1", "m2"]);
        assert!(tracker.get_dependents("m1").is_empty());
    }

    #[test]
    fn closure_collects_transitive_dependencies() {
        let tracker = tracker_with(&[("model", "material"), ("material", "shader"), ("material", "tex")]);
        assert_eq!(
            tracker.recursive_closure("model"),
            vec!["material", "shader", "tex"]
        );
    }

    #[test]
    fn dot_export_lists_nodes_and_edges() {
        let tracker = tracker_with(&[("a", "b")]);
        let dot = tracker.export_dot();
        assert!(dot.starts_with("digraph dependencies {"));
        assert!(dot.contains("\"a\" -> \"b\";"));
    }

    #[test]
    fn tree_marks_cycles_and_respects_max_depth() {
        let tracker = tracker_with(&[("a", "b"), ("b", "a")]);
        let tree = tracker.format_tree("a", 8);
        assert!(tree.contains("(cycle)"));
        let shallow = tracker.format_tree("a", 0);
        assert_eq!(shallow.lines().count(), 1);
    }

    #[test]
    fn ref_counts_saturate_at_zero() {
        let tracker = DependencyTracker::new();
        tracker.register("mesh", ResourceKind::Mesh);
        assert_eq!(tracker.add_ref("mesh").unwrap(), 1);
        assert_eq!(tracker.add_ref("mesh").unwrap(), 2);
        assert_eq!(tracker.release("mesh").unwrap(), 1);
        assert_eq!(tracker.release("mesh").unwrap(), 0);
        assert_eq!(tracker.release("mesh").unwrap(), 0);
        assert!(tracker.add_ref("ghost").is_err());
    }

    #[test]
    fn statistics_count_graph_shape() {
        let tracker = tracker_with(&[("model", "material"), ("material", "texture")]);
        let stats = tracker.statistics();
        assert_eq!(stats.resources, 3);
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.roots, 1);
        assert_eq!(stats.leaves, 1);
        assert_eq!(stats.cycles, 0);
    }
}

//! Directed graph with strongly-connected-component based cycle detection.
//!
//! Nodes are mapped to dense indices once at construction; traversal state
//! lives in flat arrays owned by each [`Cycles`] iterator, so every call to
//! [`Graph::find_cycles`] recomputes from scratch without touching the graph.
//!
//! ```text
//! 1 → 2 → 3 → 1      {1, 2, 3}   reported
//! 4 → 1              4           never reported (reaches the cycle, not part of it)
//! 5 → 5              {5}         reported (self-loop)
//! ```

use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Immutable directed graph over `T`.
#[derive(Debug, Clone)]
pub struct Graph<T> {
    nodes: Vec<T>,
    successors: Vec<Vec<usize>>,
}

impl<T: Clone + Eq + Hash> Graph<T> {
    /// Build from a node set and a successor function.
    ///
    /// Successors outside the initial set are added as nodes (and their own
    /// successors followed), so the graph is closed under `successors`.
    /// Node order is first-seen order, which keeps traversal deterministic.
    pub fn new<I, F, S>(nodes: I, mut successors: F) -> Self
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&T) -> S,
        S: IntoIterator<Item = T>,
    {
        let mut index: FxHashMap<T, usize> = FxHashMap::default();
        let mut list: Vec<T> = Vec::new();

        for node in nodes {
            if !index.contains_key(&node) {
                index.insert(node.clone(), list.len());
                list.push(node);
            }
        }

        let mut adjacency: Vec<Vec<usize>> = Vec::with_capacity(list.len());
        let mut cursor = 0;
        while cursor < list.len() {
            let mut edges = Vec::new();
            for next in successors(&list[cursor]) {
                let id = match index.get(&next) {
                    Some(&id) => id,
                    None => {
                        let id = list.len();
                        index.insert(next.clone(), id);
                        list.push(next);
                        id
                    }
                };
                edges.push(id);
            }
            adjacency.push(edges);
            cursor += 1;
        }

        Self {
            nodes: list,
            successors: adjacency,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[T] {
        &self.nodes
    }

    /// Lazily yield every non-trivial strongly connected component.
    ///
    /// A component is non-trivial when it has more than one node, or a single
    /// node with an edge to itself. Components come out in Tarjan completion
    /// order. O(V + E).
    pub fn find_cycles(&self) -> Cycles<'_, T> {
        let n = self.nodes.len();
        Cycles {
            graph: self,
            index: vec![UNVISITED; n],
            low: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            frames: Vec::new(),
            next_root: 0,
            counter: 0,
        }
    }

    /// Whether the graph contains any cycle.
    pub fn has_cycles(&self) -> bool {
        self.find_cycles().next().is_some()
    }
}

const UNVISITED: usize = usize::MAX;

/// Iterator over cyclic components; see [`Graph::find_cycles`].
///
/// Runs an iterative Tarjan traversal, suspending each time a component
/// completes, so no recursion depth limit applies.
pub struct Cycles<'g, T> {
    graph: &'g Graph<T>,
    index: Vec<usize>,
    low: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    /// DFS call stack: (node, next successor position).
    frames: Vec<(usize, usize)>,
    next_root: usize,
    counter: usize,
}

impl<T> Cycles<'_, T> {
    fn visit(&mut self, v: usize) {
        self.index[v] = self.counter;
        self.low[v] = self.counter;
        self.counter += 1;
        self.stack.push(v);
        self.on_stack[v] = true;
        self.frames.push((v, 0));
    }

    /// Pop the component rooted at `v` off the Tarjan stack.
    fn pop_component(&mut self, v: usize) -> Vec<usize> {
        let mut component = Vec::new();
        while let Some(w) = self.stack.pop() {
            self.on_stack[w] = false;
            component.push(w);
            if w == v {
                break;
            }
        }
        component
    }

    fn is_cyclic(&self, component: &[usize]) -> bool {
        match component {
            [single] => self.graph.successors[*single].contains(single),
            _ => true,
        }
    }
}

impl<T: Clone> Iterator for Cycles<'_, T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(&(v, pos)) = self.frames.last() else {
                // Start a new tree at the next unvisited node
                while self.next_root < self.index.len() && self.index[self.next_root] != UNVISITED {
                    self.next_root += 1;
                }
                if self.next_root == self.index.len() {
                    return None;
                }
                self.visit(self.next_root);
                continue;
            };

            let graph = self.graph;
            let edges = &graph.successors[v];
            if pos < edges.len() {
                let w = edges[pos];
                if let Some(frame) = self.frames.last_mut() {
                    frame.1 += 1;
                }
                if self.index[w] == UNVISITED {
                    self.visit(w);
                } else if self.on_stack[w] {
                    self.low[v] = self.low[v].min(self.index[w]);
                }
                continue;
            }

            // All successors done: return to caller frame
            self.frames.pop();
            if let Some(&(parent, _)) = self.frames.last() {
                self.low[parent] = self.low[parent].min(self.low[v]);
            }

            if self.low[v] == self.index[v] {
                let component = self.pop_component(v);
                if self.is_cyclic(&component) {
                    let nodes = &self.graph.nodes;
                    return Some(component.into_iter().map(|i| nodes[i].clone()).collect());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(u32, &[u32])]) -> Graph<u32> {
        let map: FxHashMap<u32, Vec<u32>> =
            edges.iter().map(|(n, s)| (*n, s.to_vec())).collect();
        Graph::new(edges.iter().map(|(n, _)| *n), |n| {
            map.get(n).cloned().unwrap_or_default()
        })
    }

    fn sorted_cycles(g: &Graph<u32>) -> Vec<Vec<u32>> {
        let mut cycles: Vec<Vec<u32>> = g
            .find_cycles()
            .map(|mut c| {
                c.sort();
                c
            })
            .collect();
        cycles.sort();
        cycles
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let g = graph(&[(1, &[2]), (2, &[3]), (3, &[])]);
        assert!(sorted_cycles(&g).is_empty());
        assert!(!g.has_cycles());
    }

    #[test]
    fn simple_cycle() {
        let g = graph(&[(1, &[2]), (2, &[3]), (3, &[1])]);
        assert_eq!(sorted_cycles(&g), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn back_reference_excluded() {
        let g = graph(&[(1, &[2]), (2, &[3]), (3, &[1]), (4, &[1])]);
        assert_eq!(sorted_cycles(&g), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn back_reference_visited_first_still_excluded() {
        let g = graph(&[(4, &[1]), (1, &[2]), (2, &[3]), (3, &[1])]);
        assert_eq!(sorted_cycles(&g), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn disconnected_cycles_reported_separately() {
        let g = graph(&[(1, &[2]), (2, &[1]), (3, &[4]), (4, &[3])]);
        assert_eq!(sorted_cycles(&g), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = graph(&[(1, &[1]), (2, &[3]), (3, &[])]);
        assert_eq!(sorted_cycles(&g), vec![vec![1]]);
    }

    #[test]
    fn successors_outside_node_set_are_followed() {
        // 3 and 4 are only reachable through the successor function
        let g = Graph::new([1u32], |n| match n {
            1 => vec![3],
            3 => vec![4],
            4 => vec![3],
            _ => vec![],
        });
        assert_eq!(g.len(), 3);
        assert_eq!(sorted_cycles(&g), vec![vec![3, 4]]);
    }

    #[test]
    fn find_cycles_is_recomputed_each_call() {
        let g = graph(&[(1, &[2]), (2, &[1])]);
        assert_eq!(g.find_cycles().count(), 1);
        assert_eq!(g.find_cycles().count(), 1);
    }

    #[test]
    fn nested_cycles_form_one_component() {
        let g = graph(&[(1, &[2]), (2, &[3, 1]), (3, &[2, 4]), (4, &[])]);
        assert_eq!(sorted_cycles(&g), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn long_chain_does_not_overflow() {
        let n = 100_000u32;
        let g = Graph::new(0..n, |&i| if i + 1 < n { vec![i + 1] } else { vec![0] });
        let cycles: Vec<_> = g.find_cycles().collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), n as usize);
    }

    #[test]
    fn empty_graph() {
        let g: Graph<u32> = Graph::new(Vec::new(), |_| Vec::new());
        assert!(g.is_empty());
        assert_eq!(g.find_cycles().count(), 0);
    }
}

// Copyright 2026 the Atrium Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Depth-first cycle detection over a directed dependency graph.

use std::collections::HashSet;
use std::hash::Hash;

/// Searches the graph reachable from `start` for a cycle.
///
/// The graph is described by a `neighbors` function returning the direct
/// dependencies of a node. The traversal is depth-first with a per-call
/// visited set; nodes already fully explored on another branch are skipped,
/// so diamond-shaped graphs are not reported as cyclic.
///
/// # Returns
///
/// * `Some(path)` — the nodes forming the cycle, starting and ending at the
///   repeated node (e.g. `[a, b, a]`).
/// * `None` — no cycle is reachable from `start`.
pub fn find_cycle<T, F>(start: T, neighbors: &mut F) -> Option<Vec<T>>
where
    T: Clone + Eq + Hash,
    F: FnMut(&T) -> Vec<T>,
{
    let mut path = Vec::new();
    let mut on_path = HashSet::new();
    let mut done = HashSet::new();
    visit(&start, neighbors, &mut path, &mut on_path, &mut done)
}

fn visit<T, F>(
    node: &T,
    neighbors: &mut F,
    path: &mut Vec<T>,
    on_path: &mut HashSet<T>,
    done: &mut HashSet<T>,
) -> Option<Vec<T>>
where
    T: Clone + Eq + Hash,
    F: FnMut(&T) -> Vec<T>,
{
    if on_path.contains(node) {
        let first = path.iter().position(|n| n == node).unwrap_or(0);
        let mut cycle: Vec<T> = path[first..].to_vec();
        cycle.push(node.clone());
        return Some(cycle);
    }
    if done.contains(node) {
        return None;
    }

    on_path.insert(node.clone());
    path.push(node.clone());

    for next in neighbors(node) {
        if let Some(cycle) = visit(&next, neighbors, path, on_path, done) {
            return Some(cycle);
        }
    }

    path.pop();
    on_path.remove(node);
    done.insert(node.clone());
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn graph(edges: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in edges {
            map.entry((*from).to_string())
                .or_default()
                .push((*to).to_string());
        }
        map
    }

    fn run(edges: &[(&str, &str)], start: &str) -> Option<Vec<String>> {
        let map = graph(edges);
        find_cycle(start.to_string(), &mut |n: &String| {
            map.get(n).cloned().unwrap_or_default()
        })
    }

    #[test]
    fn empty_graph_has_no_cycle() {
        assert_eq!(run(&[], "a"), None);
    }

    #[test]
    fn chain_has_no_cycle() {
        assert_eq!(run(&[("a", "b"), ("b", "c")], "a"), None);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        // a -> b -> d, a -> c -> d: d is visited twice but on separate branches.
        let edges = [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")];
        assert_eq!(run(&edges, "a"), None);
    }

    #[test]
    fn mutual_dependency_is_reported_with_path() {
        let cycle = run(&[("a", "b"), ("b", "a")], "a").expect("cycle expected");
        assert_eq!(cycle, vec!["a", "b", "a"]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let cycle = run(&[("a", "a")], "a").expect("cycle expected");
        assert_eq!(cycle, vec!["a", "a"]);
    }

    #[test]
    fn deep_cycle_is_found() {
        let edges = [("a", "b"), ("b", "c"), ("c", "d"), ("d", "b")];
        let cycle = run(&edges, "a").expect("cycle expected");
        assert_eq!(cycle, vec!["b", "c", "d", "b"]);
    }
}

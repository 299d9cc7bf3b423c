//! Shortest-path route discovery over usable channel legs.
//!
//! Plain BFS: fewest hops wins, and neighbors are visited in ascending
//! node order so route selection is deterministic for a given edge set.

use std::collections::BTreeSet;

/// Find the fewest-hop route `from -> to` over the directed `edges` set.
/// Returns the full node sequence including both endpoints.
pub fn shortest_route(
    edges: &BTreeSet<(usize, usize)>,
    from: usize,
    to: usize,
) -> Option<Vec<usize>> {
    if from == to {
        return Some(vec![from]);
    }

    let mut parent: std::collections::BTreeMap<usize, usize> = Default::default();
    let mut frontier = std::collections::VecDeque::from([from]);
    let mut seen = BTreeSet::from([from]);

    while let Some(current) = frontier.pop_front() {
        // Ascending (current, *) range keeps neighbor order deterministic.
        for &(_, next) in edges.range((current, 0)..=(current, usize::MAX)) {
            if !seen.insert(next) {
                continue;
            }
            parent.insert(next, current);
            if next == to {
                let mut route = vec![to];
                let mut hop = to;
                while let Some(&prev) = parent.get(&hop) {
                    route.push(prev);
                    hop = prev;
                }
                route.reverse();
                return Some(route);
            }
            frontier.push_back(next);
        }
    }
    None
}

use crate::{
    geometry::{Dir4, Loc},
    tile_map::TileMap,
};

use fnv::FnvHashMap;
use petgraph::{
    algo::connected_components,
    graph::{NodeIndex, UnGraph},
};

/// Builds an undirected graph whose node weights are the indices of `adjacency`.
pub fn graph_from_adjacency(adjacency: &[&[usize]]) -> UnGraph<usize, ()> {
    let mut graph = UnGraph::default();
    let nodes: Vec<NodeIndex> = (0..adjacency.len()).map(|i| graph.add_node(i)).collect();
    for (i, neighbors) in adjacency.iter().enumerate() {
        for &j in neighbors.iter() {
            // Don't visit the same undirected edge twice.
            if j > i && j < nodes.len() {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }

    graph
}

pub fn is_connected<N, E>(graph: &UnGraph<N, E>) -> bool {
    graph.node_count() <= 1 || connected_components(graph) == 1
}

/// 4-connected graph over every walkable tile except `excluded`.
pub fn walkable_graph<M: TileMap + ?Sized>(
    map: &M,
    excluded: Option<Loc>,
) -> (UnGraph<Loc, ()>, FnvHashMap<Loc, NodeIndex>) {
    let mut graph = UnGraph::default();
    let mut nodes = FnvHashMap::default();
    let size = map.size();
    for y in 0..size.y {
        for x in 0..size.x {
            let loc = Loc::new(x, y);
            if Some(loc) != excluded && map.is_walkable(loc) {
                nodes.insert(loc, graph.add_node(loc));
            }
        }
    }
    for y in 0..size.y {
        for x in 0..size.x {
            let loc = Loc::new(x, y);
            let a = match nodes.get(&loc) {
                Some(a) => *a,
                None => continue,
            };
            for dir in [Dir4::Right, Dir4::Down].iter() {
                if let Some(next) = map.normalize(loc + dir.offset()) {
                    if let Some(b) = nodes.get(&next) {
                        graph.add_edge(a, *b, ());
                    }
                }
            }
        }
    }

    (graph, nodes)
}

/// True when turning the walkable tile at `loc` into wall would split a walkable region in two.
pub fn is_choke_point<M: TileMap + ?Sized>(map: &M, loc: Loc) -> bool {
    if !map.is_walkable(loc) {
        return false;
    }
    let (with, _) = walkable_graph(map, None);
    let (without, _) = walkable_graph(map, Some(loc));

    connected_components(&without) > connected_components(&with)
}

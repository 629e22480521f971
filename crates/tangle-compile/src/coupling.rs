//! Target description shared between passes: qubit layout, coupling map,
//! basis gates, and the property set passed through the pipeline.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tangle_ir::QubitId;

use crate::error::{CompileError, CompileResult};

/// A bijective mapping between logical qubits and physical positions.
///
/// Backed by two index vectors so lookups never depend on hash order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// `logical_to_physical[l]` is the physical position of logical qubit l.
    logical_to_physical: Vec<u32>,
    /// `physical_to_logical[p]` is the logical qubit at position p.
    physical_to_logical: Vec<u32>,
}

impl Layout {
    /// Identity layout over `n` positions (logical i at physical i).
    pub fn trivial(n: u32) -> Self {
        Self {
            logical_to_physical: (0..n).collect(),
            physical_to_logical: (0..n).collect(),
        }
    }

    /// Physical position of a logical qubit.
    pub fn physical(&self, logical: QubitId) -> Option<u32> {
        self.logical_to_physical.get(logical.index()).copied()
    }

    /// Logical qubit at a physical position.
    pub fn logical(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_logical
            .get(physical as usize)
            .map(|&l| QubitId(l))
    }

    /// Exchange the logical qubits at two physical positions.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let l1 = self.physical_to_logical[p1 as usize];
        let l2 = self.physical_to_logical[p2 as usize];
        self.physical_to_logical.swap(p1 as usize, p2 as usize);
        self.logical_to_physical[l1 as usize] = p2;
        self.logical_to_physical[l2 as usize] = p1;
    }

    /// Number of positions tracked.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }

    /// `(logical, physical)` pairs in ascending logical order.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        self.logical_to_physical
            .iter()
            .enumerate()
            .map(|(l, &p)| (QubitId(l as u32), p))
    }
}

/// Directed coupling graph of a target device.
///
/// An edge `a -> b` means a controlled gate may place its control on `a`
/// and target on `b` natively. Routing distance and shortest paths are
/// computed over the undirected skeleton; direction is a separate,
/// cheaper fix at emission.
///
/// Neighbor lists are kept sorted ascending, so every BFS explores
/// lowest-index qubits first and path reconstruction is deterministic.
#[derive(Debug, Clone)]
pub struct CouplingMap {
    num_qubits: u32,
    /// Directed edges in insertion order.
    edges: Vec<(u32, u32)>,
    /// Directed adjacency, sorted ascending per source.
    directed: Vec<Vec<u32>>,
    /// Undirected adjacency, sorted ascending.
    undirected: Vec<Vec<u32>>,
    /// `dist[a][b]` over the undirected skeleton, `u32::MAX` if unreachable.
    dist: Vec<Vec<u32>>,
    /// `pred[a][b]` is the hop before `b` on the lowest-index shortest
    /// path from `a`, `u32::MAX` if unreachable.
    pred: Vec<Vec<u32>>,
}

impl CouplingMap {
    /// Empty map over `num_qubits` disconnected positions.
    pub fn new(num_qubits: u32) -> Self {
        let n = num_qubits as usize;
        Self {
            num_qubits,
            edges: vec![],
            directed: vec![vec![]; n],
            undirected: vec![vec![]; n],
            dist: vec![],
            pred: vec![],
        }
    }

    /// Add a directed edge. Duplicates are ignored; positions outside
    /// the map are rejected. Invalidates the distance matrices until
    /// [`freeze`](Self::freeze) runs again.
    pub fn add_edge(&mut self, from: u32, to: u32) -> CompileResult<()> {
        if from >= self.num_qubits || to >= self.num_qubits {
            return Err(CompileError::InvalidCouplingMap(format!(
                "edge {from} -> {to} outside positions 0..{}",
                self.num_qubits
            )));
        }
        self.insert_edge(from, to);
        Ok(())
    }

    fn insert_edge(&mut self, from: u32, to: u32) {
        if self.edges.contains(&(from, to)) {
            return;
        }
        self.edges.push((from, to));
        insert_sorted(&mut self.directed[from as usize], to);
        insert_sorted(&mut self.undirected[from as usize], to);
        insert_sorted(&mut self.undirected[to as usize], from);
    }

    /// Precompute all-pairs distances and predecessors by BFS from each
    /// position over the undirected skeleton.
    pub fn freeze(&mut self) {
        let n = self.num_qubits as usize;
        self.dist = vec![vec![u32::MAX; n]; n];
        self.pred = vec![vec![u32::MAX; n]; n];

        for src in 0..n {
            self.dist[src][src] = 0;
            let mut queue = VecDeque::new();
            queue.push_back(src as u32);
            while let Some(current) = queue.pop_front() {
                for &next in &self.undirected[current as usize] {
                    if self.dist[src][next as usize] == u32::MAX {
                        self.dist[src][next as usize] = self.dist[src][current as usize] + 1;
                        self.pred[src][next as usize] = current;
                        queue.push_back(next);
                    }
                }
            }
        }
    }

    /// Decode the map form `{"0": [2], "1": [2], "2": [3], "3": []}`.
    ///
    /// Positions are the union of keys and targets; the qubit count is
    /// one past the highest position mentioned.
    pub fn from_json(source: &str) -> CompileResult<Self> {
        let raw: BTreeMap<String, Vec<u32>> = serde_json::from_str(source)
            .map_err(|e| CompileError::InvalidCouplingMap(e.to_string()))?;

        let mut entries: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for (key, targets) in raw {
            let from: u32 = key
                .parse()
                .map_err(|_| CompileError::InvalidCouplingMap(format!("bad key '{key}'")))?;
            entries.insert(from, targets);
        }

        let max = entries
            .iter()
            .flat_map(|(&k, v)| std::iter::once(k).chain(v.iter().copied()))
            .max();
        let Some(max) = max else {
            return Err(CompileError::InvalidCouplingMap("empty map".into()));
        };

        let mut map = Self::new(max + 1);
        for (from, targets) in entries {
            for to in targets {
                map.add_edge(from, to)?;
            }
        }
        map.freeze();
        Ok(map)
    }

    /// Linear chain `0 -> 1 -> 2 -> ...`.
    pub fn linear(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.insert_edge(i, i + 1);
        }
        map.freeze();
        map
    }

    /// All-to-all connectivity, both directions.
    pub fn full(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    map.insert_edge(i, j);
                }
            }
        }
        map.freeze();
        map
    }

    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Directed edges in insertion order.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Whether `from -> to` is a native direction.
    #[inline]
    pub fn has_edge(&self, from: u32, to: u32) -> bool {
        self.directed
            .get(from as usize)
            .is_some_and(|n| n.binary_search(&to).is_ok())
    }

    /// Whether the two positions are adjacent in either direction.
    #[inline]
    pub fn is_adjacent(&self, a: u32, b: u32) -> bool {
        self.undirected
            .get(a as usize)
            .is_some_and(|n| n.binary_search(&b).is_ok())
    }

    /// Undirected shortest-path distance, if any path exists.
    pub fn distance(&self, from: u32, to: u32) -> Option<u32> {
        let d = *self.dist.get(from as usize)?.get(to as usize)?;
        (d != u32::MAX).then_some(d)
    }

    /// Whether every position can reach every other one.
    pub fn is_connected(&self) -> bool {
        (0..self.num_qubits).all(|b| self.distance(0, b).is_some())
    }

    /// Lowest-index undirected shortest path, endpoints included.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        if from == to {
            return Some(vec![from]);
        }
        self.distance(from, to)?;

        let mut path = vec![to];
        let mut current = to;
        while current != from {
            current = self.pred[from as usize][current as usize];
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}

fn insert_sorted(list: &mut Vec<u32>, value: u32) {
    if let Err(pos) = list.binary_search(&value) {
        list.insert(pos, value);
    }
}

/// Names of gates the target accepts natively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasisGates {
    gates: Vec<String>,
}

impl BasisGates {
    pub fn new(gates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            gates: gates.into_iter().map(Into::into).collect(),
        }
    }

    /// The `{u1, u2, u3, cx}` basis every pass understands.
    pub fn standard() -> Self {
        Self::new(["u1", "u2", "u3", "cx"])
    }

    pub fn contains(&self, gate: &str) -> bool {
        self.gates.iter().any(|g| g == gate)
    }

    pub fn gates(&self) -> &[String] {
        &self.gates
    }
}

impl Default for BasisGates {
    fn default() -> Self {
        Self::standard()
    }
}

/// Shared context threaded through every pass.
#[derive(Debug, Clone, Default)]
pub struct PropertySet {
    /// Logical-to-physical mapping. Written by the mapper; reflects the
    /// final placement once routing has run.
    pub layout: Option<Layout>,

    /// Target connectivity. Must be set before the mapper runs.
    pub coupling_map: Option<CouplingMap>,

    /// Target basis for unrolling.
    pub basis_gates: BasisGates,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freezing here keeps the distance matrices current with the edge
    /// set, whatever state the map arrives in.
    #[must_use]
    pub fn with_coupling_map(mut self, mut coupling_map: CouplingMap) -> Self {
        coupling_map.freeze();
        self.coupling_map = Some(coupling_map);
        self
    }

    #[must_use]
    pub fn with_basis_gates(mut self, basis_gates: BasisGates) -> Self {
        self.basis_gates = basis_gates;
        self
    }
}

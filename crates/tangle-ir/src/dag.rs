//! DAG-based circuit representation.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex as PetNodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{ClbitId, QubitId, Register};

/// Node index type for the circuit DAG.
pub type NodeIndex = PetNodeIndex<u32>;

/// A node in the circuit DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DagNode {
    /// Input terminator for a wire.
    In(WireId),
    /// Output terminator for a wire.
    Out(WireId),
    /// Operation node containing an instruction.
    Op(Instruction),
}

impl DagNode {
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self, DagNode::Op(_))
    }

    /// Get the instruction if this is an operation node.
    #[inline]
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }

    #[inline]
    pub fn instruction_mut(&mut self) -> Option<&mut Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }
}

/// Identifier for a wire in the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireId {
    /// A quantum wire.
    Qubit(QubitId),
    /// A classical wire.
    Clbit(ClbitId),
}

impl From<QubitId> for WireId {
    fn from(q: QubitId) -> Self {
        WireId::Qubit(q)
    }
}

impl From<ClbitId> for WireId {
    fn from(c: ClbitId) -> Self {
        WireId::Clbit(c)
    }
}

/// Whether qubit indices refer to abstract wires or device positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CircuitLevel {
    /// Qubits are abstract; no adjacency constraint has been applied.
    #[default]
    Logical,
    /// Qubits are physical device positions; two-qubit gates sit on
    /// coupling-map edges.
    Physical,
}

/// DAG-based circuit representation.
///
/// Nodes are input terminators, output terminators, or operations; each
/// edge carries the wire it belongs to. Every wire's operations form a
/// total order from its In node to its Out node, so the graph is acyclic
/// by construction and append never needs cycle detection.
///
/// A `wire_front` index maps each wire to the node just before its Out
/// terminator, making [`apply`](Self::apply) O(1) per touched wire.
///
/// Wires are fixed at construction time through register declarations;
/// register names and declaration order are retained for serialization.
#[derive(Debug, Clone)]
pub struct CircuitDag {
    graph: StableDiGraph<DagNode, WireId, u32>,
    /// Quantum registers in declaration order; flat qubit indices are
    /// assigned contiguously per register.
    qregs: Vec<Register>,
    /// Classical registers in declaration order.
    cregs: Vec<Register>,
    qubit_inputs: FxHashMap<QubitId, NodeIndex>,
    qubit_outputs: FxHashMap<QubitId, NodeIndex>,
    clbit_inputs: FxHashMap<ClbitId, NodeIndex>,
    clbit_outputs: FxHashMap<ClbitId, NodeIndex>,
    /// Maps each wire to the node just before its output terminator.
    wire_front: FxHashMap<WireId, NodeIndex>,
    /// Phase accumulated by rewrites that drop gates equal to identity
    /// up to global phase. Unobservable; kept for bookkeeping.
    global_phase: f64,
    level: CircuitLevel,
}

impl CircuitDag {
    /// Create a new circuit DAG with no wires.
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::default(),
            qregs: Vec::new(),
            cregs: Vec::new(),
            qubit_inputs: FxHashMap::default(),
            qubit_outputs: FxHashMap::default(),
            clbit_inputs: FxHashMap::default(),
            clbit_outputs: FxHashMap::default(),
            wire_front: FxHashMap::default(),
            global_phase: 0.0,
            level: CircuitLevel::Logical,
        }
    }

    /// Declare a quantum register, creating one wire per bit.
    ///
    /// Returns the flat id of the register's first qubit.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> QubitId {
        let start = self.num_qubits() as u32;
        self.qregs.push(Register::new(name, size, start));
        for i in 0..size {
            self.add_qubit_wire(QubitId(start + i));
        }
        QubitId(start)
    }

    /// Declare a classical register, creating one wire per bit.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> ClbitId {
        let start = self.num_clbits() as u32;
        self.cregs.push(Register::new(name, size, start));
        for i in 0..size {
            self.add_clbit_wire(ClbitId(start + i));
        }
        ClbitId(start)
    }

    fn add_qubit_wire(&mut self, qubit: QubitId) {
        let wire = WireId::Qubit(qubit);
        let in_node = self.graph.add_node(DagNode::In(wire));
        let out_node = self.graph.add_node(DagNode::Out(wire));
        self.graph.add_edge(in_node, out_node, wire);
        self.qubit_inputs.insert(qubit, in_node);
        self.qubit_outputs.insert(qubit, out_node);
        self.wire_front.insert(wire, in_node);
    }

    fn add_clbit_wire(&mut self, clbit: ClbitId) {
        let wire = WireId::Clbit(clbit);
        let in_node = self.graph.add_node(DagNode::In(wire));
        let out_node = self.graph.add_node(DagNode::Out(wire));
        self.graph.add_edge(in_node, out_node, wire);
        self.clbit_inputs.insert(clbit, in_node);
        self.clbit_outputs.insert(clbit, out_node);
        self.wire_front.insert(wire, in_node);
    }

    /// Quantum registers in declaration order.
    pub fn qregs(&self) -> &[Register] {
        &self.qregs
    }

    /// Classical registers in declaration order.
    pub fn cregs(&self) -> &[Register] {
        &self.cregs
    }

    /// Look up a classical register by name.
    pub fn creg(&self, name: &str) -> Option<&Register> {
        self.cregs.iter().find(|r| r.name == name)
    }

    /// Append an instruction to the end of the wires it touches.
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<NodeIndex> {
        let gate_name = match &instruction.kind {
            InstructionKind::Gate(gate) => Some(gate.name().to_string()),
            _ => None,
        };

        if let InstructionKind::Gate(gate) = &instruction.kind {
            let expected = gate.num_qubits() as usize;
            let got = instruction.qubits.len();
            if expected != got {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: expected as u32,
                    got: got as u32,
                });
            }
        }

        for &qubit in &instruction.qubits {
            if !self.qubit_inputs.contains_key(&qubit) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }
        for &clbit in &instruction.clbits {
            if !self.clbit_inputs.contains_key(&clbit) {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        let mut seen = rustc_hash::FxHashSet::default();
        for &qubit in &instruction.qubits {
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        let op_node = self.graph.add_node(DagNode::Op(instruction.clone()));

        let mut wires: Vec<WireId> = instruction
            .qubits
            .iter()
            .map(|&q| WireId::Qubit(q))
            .collect();
        wires.extend(instruction.clbits.iter().map(|&c| WireId::Clbit(c)));

        for wire in wires {
            let out_node = match wire {
                WireId::Qubit(q) => self.qubit_outputs[&q],
                WireId::Clbit(c) => self.clbit_outputs[&c],
            };
            let prev_node = self.wire_front[&wire];

            let edge_id = self
                .graph
                .edges_directed(prev_node, Direction::Outgoing)
                .find(|e| *e.weight() == wire && e.target() == out_node)
                .map(|e| e.id())
                .ok_or_else(|| {
                    IrError::InvalidDag(format!(
                        "missing edge from front to output on wire {wire:?}"
                    ))
                })?;
            self.graph.remove_edge(edge_id);
            self.graph.add_edge(prev_node, op_node, wire);
            self.graph.add_edge(op_node, out_node, wire);
            self.wire_front.insert(wire, op_node);
        }

        Ok(op_node)
    }

    /// Iterate operations in a single deterministic topological order.
    ///
    /// Kahn's algorithm with a min-index frontier: when several
    /// operations have no dependency relation, the one appended first
    /// (lowest node index) comes first. Emission order, and therefore
    /// output bytes, do not depend on hash iteration anywhere.
    pub fn topological_ops(&self) -> impl Iterator<Item = (NodeIndex, &Instruction)> {
        self.topological_full_order()
            .into_iter()
            .filter_map(|idx| match &self.graph[idx] {
                DagNode::Op(inst) => Some((idx, inst)),
                _ => None,
            })
    }

    /// Operation nodes along one wire, in wire order.
    pub fn wire_ops(&self, wire: WireId) -> Vec<NodeIndex> {
        let (in_node, out_node) = match wire {
            WireId::Qubit(q) => match (self.qubit_inputs.get(&q), self.qubit_outputs.get(&q)) {
                (Some(&i), Some(&o)) => (i, o),
                _ => return Vec::new(),
            },
            WireId::Clbit(c) => match (self.clbit_inputs.get(&c), self.clbit_outputs.get(&c)) {
                (Some(&i), Some(&o)) => (i, o),
                _ => return Vec::new(),
            },
        };

        let mut ops = Vec::new();
        let mut current = in_node;
        while current != out_node {
            let next = self
                .graph
                .edges_directed(current, Direction::Outgoing)
                .find(|e| *e.weight() == wire)
                .map(|e| e.target());
            match next {
                Some(n) => {
                    if self.graph[n].is_op() {
                        ops.push(n);
                    }
                    current = n;
                }
                None => break,
            }
        }
        ops
    }

    /// Get an instruction by node index.
    #[inline]
    pub fn get_instruction(&self, node: NodeIndex) -> Option<&Instruction> {
        self.graph.node_weight(node).and_then(|n| n.instruction())
    }

    /// Get a mutable instruction by node index.
    ///
    /// In-place replacement keeps the node's position in the
    /// deterministic traversal order, which removal plus re-append
    /// would not.
    #[inline]
    pub fn get_instruction_mut(&mut self, node: NodeIndex) -> Option<&mut Instruction> {
        self.graph
            .node_weight_mut(node)
            .and_then(|n| n.instruction_mut())
    }

    /// Remove an operation node, splicing each wire across the gap.
    ///
    /// Indices of other nodes are unaffected (stable graph storage).
    pub fn remove_op(&mut self, node: NodeIndex) -> IrResult<Instruction> {
        let dag_node = self
            .graph
            .node_weight(node)
            .ok_or(IrError::InvalidNode)?
            .clone();

        let DagNode::Op(instruction) = dag_node else {
            return Err(IrError::InvalidDag(
                "cannot remove a wire terminator node".into(),
            ));
        };

        let incoming: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.source(), *e.weight()))
            .collect();
        let outgoing: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.target(), *e.weight()))
            .collect();

        for (pred, wire) in &incoming {
            if self.wire_front.get(wire) == Some(&node) {
                self.wire_front.insert(*wire, *pred);
            }
        }

        self.graph.remove_node(node);

        for (pred, wire) in &incoming {
            for (succ, succ_wire) in &outgoing {
                if wire == succ_wire {
                    self.graph.add_edge(*pred, *succ, *wire);
                }
            }
        }

        Ok(instruction)
    }

    /// Get the number of qubit wires.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.qubit_inputs.len()
    }

    /// Get the number of classical wires.
    #[inline]
    pub fn num_clbits(&self) -> usize {
        self.clbit_inputs.len()
    }

    /// Get the number of operations.
    #[inline]
    pub fn num_ops(&self) -> usize {
        let io_nodes = 2 * (self.qubit_inputs.len() + self.clbit_inputs.len());
        self.graph.node_count().saturating_sub(io_nodes)
    }

    /// Count operations with the given name.
    pub fn count_ops(&self, name: &str) -> usize {
        self.graph
            .node_weights()
            .filter(|n| n.instruction().is_some_and(|i| i.name() == name))
            .count()
    }

    /// Circuit depth: longest operation chain over any wire path.
    pub fn depth(&self) -> usize {
        let mut depths: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut max_depth = 0usize;

        for node in self.topological_full_order() {
            let max_pred = self
                .graph
                .edges_directed(node, Direction::Incoming)
                .map(|e| depths.get(&e.source()).copied().unwrap_or(0))
                .max()
                .unwrap_or(0);
            let d = if self.graph[node].is_op() {
                max_pred + 1
            } else {
                max_pred
            };
            max_depth = max_depth.max(d);
            depths.insert(node, d);
        }
        max_depth
    }

    /// Full node order including terminators, same tie-break as
    /// [`topological_ops`](Self::topological_ops).
    fn topological_full_order(&self) -> Vec<NodeIndex> {
        let mut indegree: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        for node in self.graph.node_indices() {
            indegree.insert(
                node,
                self.graph.edges_directed(node, Direction::Incoming).count(),
            );
        }
        let mut ready: BinaryHeap<Reverse<NodeIndex>> = self
            .graph
            .node_indices()
            .filter(|n| indegree[n] == 0)
            .map(Reverse)
            .collect();
        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for edge in self.graph.edges_directed(node, Direction::Outgoing) {
                let target = edge.target();
                if let Some(d) = indegree.get_mut(&target) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(Reverse(target));
                    }
                }
            }
        }
        order
    }

    /// Iterate over qubit ids in ascending order.
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        (0..self.num_qubits() as u32).map(QubitId)
    }

    /// Iterate over clbit ids in ascending order.
    pub fn clbits(&self) -> impl Iterator<Item = ClbitId> + '_ {
        (0..self.num_clbits() as u32).map(ClbitId)
    }

    /// Get the accumulated global phase.
    pub fn global_phase(&self) -> f64 {
        self.global_phase
    }

    /// Add to the accumulated global phase.
    pub fn accumulate_global_phase(&mut self, phase: f64) {
        self.global_phase += phase;
    }

    pub fn level(&self) -> CircuitLevel {
        self.level
    }

    pub fn set_level(&mut self, level: CircuitLevel) {
        self.level = level;
    }

    /// Verify the structural integrity of the DAG.
    ///
    /// Checks acyclicity, per-register terminator pairing, and wire
    /// continuity from each In terminator to its Out terminator.
    pub fn verify_integrity(&self) -> IrResult<()> {
        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(IrError::InvalidDag("graph contains a cycle".into()));
        }

        for &qubit in self.qubit_inputs.keys() {
            if !self.qubit_outputs.contains_key(&qubit) {
                return Err(IrError::InvalidDag(format!(
                    "qubit {qubit:?} has an In node but no Out node"
                )));
            }
        }
        for &clbit in self.clbit_inputs.keys() {
            if !self.clbit_outputs.contains_key(&clbit) {
                return Err(IrError::InvalidDag(format!(
                    "clbit {clbit:?} has an In node but no Out node"
                )));
            }
        }

        for (&qubit, &in_node) in &self.qubit_inputs {
            self.walk_wire(WireId::Qubit(qubit), in_node, self.qubit_outputs[&qubit])?;
        }
        for (&clbit, &in_node) in &self.clbit_inputs {
            self.walk_wire(WireId::Clbit(clbit), in_node, self.clbit_outputs[&clbit])?;
        }

        Ok(())
    }

    fn walk_wire(&self, wire: WireId, in_node: NodeIndex, out_node: NodeIndex) -> IrResult<()> {
        let mut current = in_node;
        let mut steps = 0usize;
        let max_steps = self.graph.node_count();
        while current != out_node {
            let next = self
                .graph
                .edges_directed(current, Direction::Outgoing)
                .find(|e| *e.weight() == wire)
                .map(|e| e.target());
            match next {
                Some(n) => current = n,
                None => {
                    return Err(IrError::InvalidDag(format!(
                        "wire {wire:?} is broken: no outgoing edge from node {current:?}"
                    )));
                }
            }
            steps += 1;
            if steps > max_steps {
                return Err(IrError::InvalidDag(format!(
                    "wire {wire:?} does not reach its output terminator"
                )));
            }
        }
        Ok(())
    }
}

impl Default for CircuitDag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::StandardGate;
    use crate::parameter::ParameterExpression;

    fn u1(q: u32) -> Instruction {
        Instruction::single_qubit_gate(
            StandardGate::U1(ParameterExpression::pi()),
            QubitId(q),
        )
    }

    #[test]
    fn empty_dag() {
        let dag = CircuitDag::new();
        assert_eq!(dag.num_qubits(), 0);
        assert_eq!(dag.num_clbits(), 0);
        assert_eq!(dag.num_ops(), 0);
        assert_eq!(dag.depth(), 0);
    }

    #[test]
    fn registers_assign_contiguous_wires() {
        let mut dag = CircuitDag::new();
        let qr = dag.add_qreg("qr", 2);
        let anc = dag.add_qreg("anc", 3);
        assert_eq!(qr, QubitId(0));
        assert_eq!(anc, QubitId(2));
        assert_eq!(dag.num_qubits(), 5);
        assert_eq!(dag.qregs()[1].name, "anc");
        assert_eq!(dag.qregs()[1].start, 2);
    }

    #[test]
    fn apply_and_depth() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 2);
        dag.apply(u1(0)).unwrap();
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(0),
            QubitId(1),
        ))
        .unwrap();
        assert_eq!(dag.num_ops(), 2);
        assert_eq!(dag.depth(), 2);
    }

    #[test]
    fn parallel_gates_depth_one() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 2);
        dag.apply(u1(0)).unwrap();
        dag.apply(u1(1)).unwrap();
        assert_eq!(dag.num_ops(), 2);
        assert_eq!(dag.depth(), 1);
    }

    #[test]
    fn topological_order_is_insertion_order_for_independent_ops() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 3);
        // Independent ops on distinct wires, inserted 2, 0, 1.
        dag.apply(u1(2)).unwrap();
        dag.apply(u1(0)).unwrap();
        dag.apply(u1(1)).unwrap();
        let qubits: Vec<u32> = dag
            .topological_ops()
            .map(|(_, inst)| inst.qubits[0].0)
            .collect();
        assert_eq!(qubits, vec![2, 0, 1]);
    }

    #[test]
    fn gate_arity_mismatch() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 2);
        let inst = Instruction::gate(StandardGate::CX, [QubitId(0)]);
        match dag.apply(inst) {
            Err(IrError::QubitCountMismatch {
                gate_name,
                expected,
                got,
            }) => {
                assert_eq!(gate_name, "cx");
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            other => panic!("expected QubitCountMismatch, got {other:?}"),
        }
    }

    #[test]
    fn unknown_qubit_reports_gate_context() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 1);
        let inst = Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(99));
        match dag.apply(inst) {
            Err(IrError::QubitNotFound { qubit, gate_name }) => {
                assert_eq!(qubit, QubitId(99));
                assert_eq!(gate_name, Some("cx".to_string()));
            }
            other => panic!("expected QubitNotFound, got {other:?}"),
        }
    }

    #[test]
    fn remove_op_splices_wire() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 1);
        let a = dag.apply(u1(0)).unwrap();
        let b = dag.apply(u1(0)).unwrap();
        let c = dag.apply(u1(0)).unwrap();

        dag.remove_op(b).unwrap();
        assert_eq!(dag.num_ops(), 2);
        dag.verify_integrity().unwrap();

        let order: Vec<NodeIndex> = dag.topological_ops().map(|(n, _)| n).collect();
        assert_eq!(order, vec![a, c]);

        // A later append still lands after the survivors.
        dag.apply(u1(0)).unwrap();
        dag.verify_integrity().unwrap();
        assert_eq!(dag.wire_ops(WireId::Qubit(QubitId(0))).len(), 3);
    }

    #[test]
    fn wire_ops_in_wire_order() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 2);
        dag.add_creg("c", 2);
        let a = dag.apply(u1(0)).unwrap();
        let b = dag
            .apply(Instruction::two_qubit_gate(
                StandardGate::CX,
                QubitId(0),
                QubitId(1),
            ))
            .unwrap();
        let m = dag
            .apply(Instruction::measure(QubitId(0), ClbitId(0)))
            .unwrap();

        assert_eq!(dag.wire_ops(WireId::Qubit(QubitId(0))), vec![a, b, m]);
        assert_eq!(dag.wire_ops(WireId::Qubit(QubitId(1))), vec![b]);
        assert_eq!(dag.wire_ops(WireId::Clbit(ClbitId(0))), vec![m]);
        assert!(dag.wire_ops(WireId::Clbit(ClbitId(1))).is_empty());
    }

    #[test]
    fn integrity_with_measurement() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 3);
        dag.add_creg("c", 3);
        dag.apply(u1(0)).unwrap();
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(0),
            QubitId(1),
        ))
        .unwrap();
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(1),
            QubitId(2),
        ))
        .unwrap();
        for i in 0..3u32 {
            dag.apply(Instruction::measure(QubitId(i), ClbitId(i)))
                .unwrap();
        }
        dag.verify_integrity().unwrap();
        assert_eq!(dag.count_ops("measure"), 3);
        assert_eq!(dag.count_ops("cx"), 2);
    }
}

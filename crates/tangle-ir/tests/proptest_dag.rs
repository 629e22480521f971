//! Property tests for the circuit DAG.

use proptest::prelude::*;

use tangle_ir::dag::NodeIndex;
use tangle_ir::{CircuitDag, ClbitId, Instruction, ParameterExpression, QubitId, StandardGate};

const NUM_QUBITS: u32 = 4;

#[derive(Debug, Clone)]
enum Op {
    U1 { qubit: u32, angle: f64 },
    Cx { control: u32, target: u32 },
    Measure { qubit: u32, clbit: u32 },
}

impl Op {
    fn instruction(&self) -> Instruction {
        match *self {
            Op::U1 { qubit, angle } => Instruction::single_qubit_gate(
                StandardGate::U1(ParameterExpression::constant(angle)),
                QubitId(qubit),
            ),
            Op::Cx { control, target } => {
                Instruction::two_qubit_gate(StandardGate::CX, QubitId(control), QubitId(target))
            }
            Op::Measure { qubit, clbit } => {
                Instruction::measure(QubitId(qubit), ClbitId(clbit))
            }
        }
    }
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..NUM_QUBITS, -10.0..10.0f64).prop_map(|(qubit, angle)| Op::U1 { qubit, angle }),
        (0..NUM_QUBITS, 0..NUM_QUBITS - 1).prop_map(|(control, t)| Op::Cx {
            control,
            // Skip the control index so the operands stay distinct.
            target: if t >= control { t + 1 } else { t },
        }),
        (0..NUM_QUBITS, 0..NUM_QUBITS).prop_map(|(qubit, clbit)| Op::Measure { qubit, clbit }),
    ]
}

fn build(ops: &[Op]) -> (CircuitDag, Vec<NodeIndex>) {
    let mut dag = CircuitDag::new();
    dag.add_qreg("q", NUM_QUBITS);
    dag.add_creg("c", NUM_QUBITS);
    let nodes = ops
        .iter()
        .map(|op| dag.apply(op.instruction()).unwrap())
        .collect();
    (dag, nodes)
}

proptest! {
    #[test]
    fn topological_order_is_insertion_order(ops in prop::collection::vec(arb_op(), 0..24)) {
        let (dag, nodes) = build(&ops);
        let visited: Vec<NodeIndex> = dag.topological_ops().map(|(n, _)| n).collect();
        prop_assert_eq!(visited, nodes);
    }

    #[test]
    fn order_is_stable_under_removal(
        ops in prop::collection::vec(arb_op(), 1..24),
        mask in prop::collection::vec(any::<bool>(), 24),
    ) {
        let (mut dag, nodes) = build(&ops);

        let mut kept = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            if mask[i] {
                dag.remove_op(*node).unwrap();
            } else {
                kept.push(*node);
            }
        }

        let visited: Vec<NodeIndex> = dag.topological_ops().map(|(n, _)| n).collect();
        prop_assert_eq!(visited, kept.clone());
        prop_assert_eq!(dag.num_ops(), kept.len());
    }

    #[test]
    fn depth_never_exceeds_op_count(ops in prop::collection::vec(arb_op(), 0..24)) {
        let (dag, _) = build(&ops);
        prop_assert!(dag.depth() <= dag.num_ops());
    }
}

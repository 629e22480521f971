//! End-to-end pipeline tests.
//!
//! Circuits run through parse, unroll, routing, and optimization, and a
//! small statevector simulator checks that the set of possible
//! measurement outcomes is unchanged by compilation.

use std::collections::BTreeSet;

use num_complex::Complex64;

use tangle_compile::passes::Optimize1qGates;
use tangle_compile::unitary::Unitary2x2;
use tangle_compile::{compile, BasisGates, CouplingMap, Pass, PassManager, PropertySet, Unroller};
use tangle_ir::{CircuitDag, GateKind, InstructionKind, StandardGate};
use tangle_qasm::{emit, parse};

const AMP_EPSILON: f64 = 1e-9;

/// Dense statevector simulator over the `u1`/`u2`/`u3`/`cx` basis.
///
/// Qubit `i` is bit `i` of the basis index. Measurements are assumed to
/// be terminal; the outcome set is read from the final state.
struct Simulator {
    state: Vec<Complex64>,
    /// clbit index to the qubit last measured into it.
    measured: Vec<Option<usize>>,
}

impl Simulator {
    fn run(dag: &CircuitDag) -> Self {
        let num_qubits = dag.num_qubits();
        let mut state = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        state[0] = Complex64::new(1.0, 0.0);
        let mut sim = Simulator {
            state,
            measured: vec![None; dag.num_clbits()],
        };

        for (_, instruction) in dag.topological_ops() {
            match &instruction.kind {
                InstructionKind::Gate(gate) => sim.apply_gate(gate, &instruction.qubits),
                InstructionKind::Measure => {
                    let q = instruction.qubits[0].index();
                    let c = instruction.clbits[0].index();
                    sim.measured[c] = Some(q);
                }
                InstructionKind::Reset => panic!("reset not supported by the test simulator"),
                InstructionKind::Barrier => {}
            }
        }
        sim
    }

    fn apply_gate(&mut self, gate: &tangle_ir::Gate, qubits: &[tangle_ir::QubitId]) {
        assert!(gate.condition.is_none(), "conditioned gates not simulated");
        let GateKind::Standard(standard) = &gate.kind else {
            panic!("non-basis gate {} reached the simulator", gate.name());
        };
        let angle = |p: &tangle_ir::ParameterExpression| p.as_f64().unwrap();
        match standard {
            StandardGate::U1(l) => self.apply_1q(&Unitary2x2::u1(angle(l)), qubits[0].index()),
            StandardGate::U2(p, l) => {
                self.apply_1q(&Unitary2x2::u2(angle(p), angle(l)), qubits[0].index());
            }
            StandardGate::U3(t, p, l) => {
                self.apply_1q(
                    &Unitary2x2::u3(angle(t), angle(p), angle(l)),
                    qubits[0].index(),
                );
            }
            StandardGate::CX => self.apply_cx(qubits[0].index(), qubits[1].index()),
        }
    }

    fn apply_1q(&mut self, u: &Unitary2x2, target: usize) {
        let [a, b, c, d] = u.data;
        let mask = 1 << target;
        for i in 0..self.state.len() {
            if i & mask == 0 {
                let j = i | mask;
                let (s0, s1) = (self.state[i], self.state[j]);
                self.state[i] = a * s0 + b * s1;
                self.state[j] = c * s0 + d * s1;
            }
        }
    }

    fn apply_cx(&mut self, control: usize, target: usize) {
        let cmask = 1 << control;
        let tmask = 1 << target;
        for i in 0..self.state.len() {
            if i & cmask != 0 && i & tmask == 0 {
                self.state.swap(i, i | tmask);
            }
        }
    }

    /// Classical bitstrings reachable with nonzero probability, rendered
    /// clbit 0 first. Unmeasured clbits read 0.
    fn outcome_keys(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        for (basis, amp) in self.state.iter().enumerate() {
            if amp.norm_sqr() < AMP_EPSILON {
                continue;
            }
            let key: String = self
                .measured
                .iter()
                .map(|m| match m {
                    Some(q) if basis >> q & 1 == 1 => '1',
                    _ => '0',
                })
                .collect();
            keys.insert(key);
        }
        keys
    }
}

fn unroll(source: &str) -> CircuitDag {
    let program = parse(source).unwrap();
    Unroller::new(BasisGates::standard())
        .unwrap()
        .unroll(&program)
        .unwrap()
}

fn spec_coupling() -> CouplingMap {
    CouplingMap::from_json(r#"{"0": [2], "1": [2], "2": [3], "3": []}"#).unwrap()
}

#[test]
fn mapping_preserves_outcomes() {
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[4];
        creg c[4];
        h q[0];
        cx q[0], q[1];
        cx q[1], q[3];
        measure q -> c;
    "#;

    let logical = Simulator::run(&unroll(source)).outcome_keys();

    let program = parse(source).unwrap();
    let props = PropertySet::new().with_coupling_map(spec_coupling());
    let mapped = compile(&program, props).unwrap();
    let physical = Simulator::run(&mapped).outcome_keys();

    // GHZ on three of the four qubits.
    assert_eq!(logical.len(), 2);
    assert_eq!(logical, physical);
}

#[test]
fn direction_fix_preserves_outcomes() {
    // cx q[2], q[0] runs against the native 0 -> 2 edge and needs
    // Hadamard conjugation.
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[4];
        creg c[4];
        h q[2];
        cx q[2], q[0];
        measure q -> c;
    "#;

    let logical = Simulator::run(&unroll(source)).outcome_keys();

    let program = parse(source).unwrap();
    let props = PropertySet::new().with_coupling_map(spec_coupling());
    let mapped = compile(&program, props).unwrap();
    let physical = Simulator::run(&mapped).outcome_keys();

    assert_eq!(logical, physical);
}

#[test]
fn swap_insertion_preserves_outcomes() {
    // Qubits 0 and 1 are not adjacent; the route goes through 2.
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[4];
        creg c[2];
        h q[0];
        cx q[0], q[1];
        measure q[0] -> c[0];
        measure q[1] -> c[1];
    "#;

    let logical = Simulator::run(&unroll(source)).outcome_keys();

    let program = parse(source).unwrap();
    let props = PropertySet::new().with_coupling_map(spec_coupling());
    let mapped = compile(&program, props).unwrap();
    let physical = Simulator::run(&mapped).outcome_keys();

    assert_eq!(logical, BTreeSet::from(["00".to_string(), "11".to_string()]));
    assert_eq!(logical, physical);
}

#[test]
fn pipeline_emission_is_deterministic() {
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[4];
        creg c[4];
        h q[0];
        cx q[0], q[1];
        t q[2];
        cx q[1], q[3];
        measure q -> c;
    "#;

    let run = || {
        let program = parse(source).unwrap();
        let props = PropertySet::new().with_coupling_map(spec_coupling());
        emit(&compile(&program, props).unwrap()).unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
}

#[test]
fn hadamard_pair_is_eliminated() {
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[1];
        creg c[1];
        h q[0];
        h q[0];
        measure q[0] -> c[0];
    "#;

    let program = parse(source).unwrap();
    let dag = compile(&program, PropertySet::new()).unwrap();
    assert_eq!(dag.num_ops(), 1, "only the measure should remain");
}

#[test]
fn full_turn_u1_is_eliminated() {
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[1];
        u1(2*pi) q[0];
    "#;

    let program = parse(source).unwrap();
    let dag = compile(&program, PropertySet::new()).unwrap();
    assert_eq!(dag.num_ops(), 0);
}

#[test]
fn symbolic_angle_survives_to_output() {
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[1];
        u1(-0.1 + 0.55*pi) q[0];
    "#;

    let program = parse(source).unwrap();
    let dag = compile(&program, PropertySet::new()).unwrap();
    let qasm = emit(&dag).unwrap();
    assert!(qasm.contains("u1(-0.1 + 0.55*pi) q[0];"), "{qasm}");
}

#[test]
fn numeric_angle_emits_full_precision() {
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[1];
        u1(sin(-0.5)) q[0];
    "#;

    let program = parse(source).unwrap();
    let dag = compile(&program, PropertySet::new()).unwrap();
    let qasm = emit(&dag).unwrap();
    assert!(qasm.contains("u1(-0.479425538604203) q[0];"), "{qasm}");
}

#[test]
fn optimizer_is_idempotent() {
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[2];
        creg c[2];
        h q[0];
        t q[0];
        t q[0];
        cx q[0], q[1];
        s q[1];
        measure q -> c;
    "#;

    let program = parse(source).unwrap();
    let mut dag = compile(&program, PropertySet::new()).unwrap();
    let first = emit(&dag).unwrap();

    let mut props = PropertySet::new();
    Optimize1qGates.run(&mut dag, &mut props).unwrap();
    let second = emit(&dag).unwrap();

    assert_eq!(first, second);
}

#[test]
fn emitted_text_round_trips() {
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[3];
        creg c[3];
        h q[0];
        cx q[0], q[1];
        u1(-0.1 + 0.55*pi) q[2];
        barrier q;
        measure q -> c;
    "#;

    let first = emit(&unroll(source)).unwrap();
    let second = emit(&unroll(&first)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn compiled_output_round_trips_through_the_pipeline() {
    // Covers swap insertion and direction fixing: recompiling the
    // emitted text against the same target must be a fixed point.
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[4];
        creg c[4];
        h q[0];
        cx q[0], q[1];
        cx q[2], q[0];
        t q[3];
        measure q -> c;
    "#;

    let recompile = |text: &str| {
        let program = parse(text).unwrap();
        let props = PropertySet::new().with_coupling_map(spec_coupling());
        emit(&compile(&program, props).unwrap()).unwrap()
    };

    let first = recompile(source);
    let second = recompile(&first);
    assert_eq!(first, second);
}

#[test]
fn compile_without_coupling_skips_routing() {
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg a[2];
        qreg b[1];
        creg c[3];
        cx a[0], b[0];
        measure a[0] -> c[0];
    "#;

    let program = parse(source).unwrap();
    let dag = compile(&program, PropertySet::new()).unwrap();
    // Register structure is untouched when no target is given.
    assert_eq!(dag.qregs().len(), 2);
    assert_eq!(dag.num_ops(), 2);
}

#[test]
fn empty_manager_is_a_no_op() {
    let source = r#"
        OPENQASM 2.0;
        include "qelib1.inc";
        qreg q[2];
        h q[0];
        h q[0];
    "#;

    let mut dag = unroll(source);
    let before = emit(&dag).unwrap();
    PassManager::new()
        .run(&mut dag, &mut PropertySet::new())
        .unwrap();
    assert_eq!(emit(&dag).unwrap(), before);
}

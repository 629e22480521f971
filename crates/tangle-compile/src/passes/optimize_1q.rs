//! Single-qubit gate fusion and cancellation.
//!
//! Collects per-wire maximal runs of unconditioned `u1`/`u2`/`u3` gates.
//! All-`u1` runs fuse by symbolic angle addition, keeping expression
//! text intact; other runs compose numerically and are re-emitted as the
//! cheapest equivalent (`nothing`, `u1`, `u2`, or `u3`) chosen by matrix
//! tolerance. Runs that still contain unresolvable symbols, and runs of
//! a single non-droppable gate, are left exactly as they are, which
//! makes the pass idempotent.

use tracing::{debug, trace};

use tangle_ir::dag::NodeIndex;
use tangle_ir::{
    CircuitDag, GateKind, Instruction, InstructionKind, ParameterExpression, QubitId, StandardGate,
};

use crate::coupling::PropertySet;
use crate::error::CompileResult;
use crate::pass::Pass;
use crate::unitary::{Unitary2x2, MATRIX_EPSILON};

/// Single-qubit gate optimization pass.
pub struct Optimize1qGates;

/// One fusible gate inside a run, in wire order.
struct RunGate {
    node: NodeIndex,
    gate: StandardGate,
}

impl Pass for Optimize1qGates {
    fn name(&self) -> &str {
        "Optimize1qGates"
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let runs = collect_runs(dag);
        debug!(runs = runs.len(), "fusing single-qubit runs");

        for (qubit, run) in runs {
            rewrite_run(dag, qubit, run)?;
        }
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.num_ops() > 0
    }
}

/// Whether an instruction can join a fusion run on its wire.
fn fusible_gate(instruction: &Instruction) -> Option<StandardGate> {
    if !instruction.is_fusible_1q() {
        return None;
    }
    let InstructionKind::Gate(gate) = &instruction.kind else {
        return None;
    };
    match &gate.kind {
        GateKind::Standard(g @ (StandardGate::U1(_) | StandardGate::U2(..) | StandardGate::U3(..))) => {
            Some(g.clone())
        }
        _ => None,
    }
}

/// Per-wire maximal runs, wires in ascending order. Everything that is
/// not a fusible 1q gate on the wire breaks the run at that point.
fn collect_runs(dag: &CircuitDag) -> Vec<(QubitId, Vec<RunGate>)> {
    let mut per_wire: Vec<(QubitId, Vec<Option<RunGate>>)> =
        dag.qubits().map(|q| (q, Vec::new())).collect();

    for (node, instruction) in dag.topological_ops() {
        for &qubit in &instruction.qubits {
            let entry = &mut per_wire[qubit.index()].1;
            match fusible_gate(instruction) {
                Some(gate) => entry.push(Some(RunGate { node, gate })),
                None => entry.push(None),
            }
        }
    }

    let mut runs = Vec::new();
    for (qubit, items) in per_wire {
        let mut current: Vec<RunGate> = Vec::new();
        for item in items {
            match item {
                Some(run_gate) => current.push(run_gate),
                None => {
                    if !current.is_empty() {
                        runs.push((qubit, std::mem::take(&mut current)));
                    }
                }
            }
        }
        if !current.is_empty() {
            runs.push((qubit, current));
        }
    }
    runs
}

fn rewrite_run(dag: &mut CircuitDag, qubit: QubitId, run: Vec<RunGate>) -> CompileResult<()> {
    if run.iter().all(|g| matches!(g.gate, StandardGate::U1(_))) {
        return rewrite_u1_run(dag, qubit, run);
    }

    // Numeric composition needs every angle resolved.
    let all_numeric = run.iter().all(|g| {
        g.gate
            .parameters()
            .iter()
            .all(|p| p.as_f64().is_some())
    });
    if !all_numeric || run.len() < 2 {
        return Ok(());
    }

    let mut combined = Unitary2x2::identity();
    for run_gate in &run {
        // Parameters checked numeric above.
        let u = match &run_gate.gate {
            StandardGate::U1(l) => Unitary2x2::u1(l.as_f64().unwrap_or_default()),
            StandardGate::U2(p, l) => Unitary2x2::u2(
                p.as_f64().unwrap_or_default(),
                l.as_f64().unwrap_or_default(),
            ),
            StandardGate::U3(t, p, l) => Unitary2x2::u3(
                t.as_f64().unwrap_or_default(),
                p.as_f64().unwrap_or_default(),
                l.as_f64().unwrap_or_default(),
            ),
            StandardGate::CX => continue,
        };
        combined = u * combined;
    }

    let replacement = classify(&combined);
    trace!(?qubit, run_len = run.len(), "rewriting numeric run");
    replace_run(dag, qubit, &run, replacement)
}

/// u1-only runs fuse by expression addition so symbolic text survives.
fn rewrite_u1_run(dag: &mut CircuitDag, qubit: QubitId, run: Vec<RunGate>) -> CompileResult<()> {
    let mut total: Option<ParameterExpression> = None;
    for run_gate in &run {
        let StandardGate::U1(lambda) = &run_gate.gate else {
            continue;
        };
        total = Some(match total {
            Some(sum) => sum + lambda.clone(),
            None => lambda.clone(),
        });
    }
    let Some(total) = total else {
        return Ok(());
    };
    let total = total.simplify();

    // Angles that are a multiple of 2pi are the identity.
    let vanishes = total
        .as_f64()
        .is_some_and(|v| Unitary2x2::normalize_angle(v).abs() < MATRIX_EPSILON);

    if vanishes {
        replace_run(dag, qubit, &run, None)
    } else if run.len() > 1 {
        replace_run(dag, qubit, &run, Some(StandardGate::U1(total)))
    } else {
        Ok(())
    }
}

/// Pick the cheapest basis form for a composed unitary.
fn classify(u: &Unitary2x2) -> Option<StandardGate> {
    use std::f64::consts::PI;

    if u.is_identity_up_to_phase() {
        return None;
    }

    let (alpha, beta, gamma, _phase) = u.zyz_decomposition();
    let beta = Unitary2x2::normalize_angle(beta);

    if beta.abs() < MATRIX_EPSILON {
        let lambda = Unitary2x2::normalize_angle(alpha + gamma);
        return Some(StandardGate::U1(ParameterExpression::constant(lambda)));
    }

    if (beta - PI / 2.0).abs() < MATRIX_EPSILON {
        return Some(StandardGate::U2(
            ParameterExpression::constant(Unitary2x2::normalize_angle(alpha)),
            ParameterExpression::constant(Unitary2x2::normalize_angle(gamma)),
        ));
    }

    Some(StandardGate::U3(
        ParameterExpression::constant(beta),
        ParameterExpression::constant(Unitary2x2::normalize_angle(alpha)),
        ParameterExpression::constant(Unitary2x2::normalize_angle(gamma)),
    ))
}

/// Replace a run with at most one gate: rewrite the first node in place
/// (keeping its position on the wire) and splice out the rest.
fn replace_run(
    dag: &mut CircuitDag,
    qubit: QubitId,
    run: &[RunGate],
    replacement: Option<StandardGate>,
) -> CompileResult<()> {
    let mut remove_from = 0;
    if let Some(gate) = replacement {
        if let Some(instruction) = dag.get_instruction_mut(run[0].node) {
            *instruction = Instruction::single_qubit_gate(gate, qubit);
        }
        remove_from = 1;
    }
    for run_gate in &run[remove_from..] {
        dag.remove_op(run_gate.node)?;
    }
    Ok(())
}

//! Coupling-map-aware mapping pass.
//!
//! Rebuilds the circuit over a single physical register, inserting swap
//! chains along undirected shortest paths for non-adjacent two-qubit
//! gates and fixing cx direction by Hadamard conjugation where only the
//! reverse edge exists. Measurements keep their original classical
//! target, so the logical-to-classical correspondence of outcomes is
//! preserved no matter where routing moves a qubit.

use tracing::{debug, trace};

use tangle_ir::{
    CircuitDag, CircuitLevel, ClassicalCondition, ClbitId, Gate, GateKind, Instruction,
    InstructionKind, ParameterExpression, QubitId, StandardGate,
};

use crate::coupling::{CouplingMap, Layout, PropertySet};
use crate::error::{CompileError, CompileResult};
use crate::pass::Pass;

/// Swap-insertion mapper with an identity initial layout.
pub struct SwapMapper;

impl Pass for SwapMapper {
    fn name(&self) -> &str {
        "SwapMapper"
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;

        #[allow(clippy::cast_possible_truncation)]
        let needed = dag.num_qubits() as u32;
        if needed > coupling.num_qubits() {
            return Err(CompileError::CircuitTooWide {
                needed,
                available: coupling.num_qubits(),
            });
        }

        let mut out = CircuitDag::new();
        out.add_qreg("q", coupling.num_qubits());
        for creg in dag.cregs() {
            out.add_creg(creg.name.clone(), creg.size);
        }

        let mut layout = Layout::trivial(coupling.num_qubits());

        for (_, instruction) in dag.topological_ops() {
            self.map_instruction(instruction, coupling, &mut layout, &mut out)?;
        }

        out.set_level(CircuitLevel::Physical);
        debug!(
            cx_count = out.count_ops("cx"),
            final_ops = out.num_ops(),
            "mapping complete"
        );

        properties.layout = Some(layout);
        *dag = out;
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some()
    }
}

impl SwapMapper {
    fn map_instruction(
        &self,
        instruction: &Instruction,
        coupling: &CouplingMap,
        layout: &mut Layout,
        out: &mut CircuitDag,
    ) -> CompileResult<()> {
        match &instruction.kind {
            InstructionKind::Measure => {
                let p = physical(layout, instruction.qubits[0])?;
                out.apply(Instruction::measure(p, instruction.clbits[0]))?;
                Ok(())
            }

            InstructionKind::Reset => {
                let p = physical(layout, instruction.qubits[0])?;
                out.apply(Instruction::reset(p))?;
                Ok(())
            }

            InstructionKind::Barrier => {
                let mapped: Vec<QubitId> = instruction
                    .qubits
                    .iter()
                    .map(|&q| physical(layout, q))
                    .collect::<CompileResult<_>>()?;
                out.apply(Instruction::barrier(mapped))?;
                Ok(())
            }

            InstructionKind::Gate(gate) if gate.num_qubits() == 2 => self.map_2q(
                gate,
                instruction.qubits[0],
                instruction.qubits[1],
                &instruction.clbits,
                coupling,
                layout,
                out,
            ),

            InstructionKind::Gate(gate) => {
                // 1q gates (and any wider named gate) just re-target.
                let mapped: Vec<QubitId> = instruction
                    .qubits
                    .iter()
                    .map(|&q| physical(layout, q))
                    .collect::<CompileResult<_>>()?;
                let mut inst = Instruction::gate(gate.clone(), mapped);
                inst.clbits = instruction.clbits.clone();
                out.apply(inst)?;
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn map_2q(
        &self,
        gate: &Gate,
        q0: QubitId,
        q1: QubitId,
        clbits: &[ClbitId],
        coupling: &CouplingMap,
        layout: &mut Layout,
        out: &mut CircuitDag,
    ) -> CompileResult<()> {
        let p0 = physical(layout, q0)?.0;
        let p1 = physical(layout, q1)?.0;

        if !coupling.is_adjacent(p0, p1) {
            let path =
                coupling
                    .shortest_path(p0, p1)
                    .ok_or(CompileError::DisconnectedCoupling {
                        from: p0,
                        to: p1,
                    })?;
            trace!(?path, "routing through swap chain");

            // Walk the control toward the target, one swap per hop,
            // stopping on the position adjacent to the target.
            for hop in path.windows(2).take(path.len() - 2) {
                emit_swap(out, coupling, hop[0], hop[1])?;
                layout.swap(hop[0], hop[1]);
            }
        }

        let a = physical(layout, q0)?.0;
        let b = physical(layout, q1)?.0;

        let is_cx = matches!(gate.kind, GateKind::Standard(StandardGate::CX));
        if is_cx && !coupling.has_edge(a, b) {
            // Only the reverse direction is native: conjugate with
            // Hadamards on both wires. The wraps inherit the condition so
            // the whole group is a unit.
            let condition = gate.condition.as_ref();
            emit_h(out, a, condition, clbits)?;
            emit_h(out, b, condition, clbits)?;
            emit_conditioned(out, StandardGate::CX.into(), &[b, a], condition, clbits)?;
            emit_h(out, a, condition, clbits)?;
            emit_h(out, b, condition, clbits)?;
            return Ok(());
        }

        // Non-cx 2q gates are direction-agnostic; emit on the native
        // direction when only the reverse edge exists.
        let (a, b) = if !is_cx && !coupling.has_edge(a, b) && coupling.has_edge(b, a) {
            (b, a)
        } else {
            (a, b)
        };

        let mut inst = Instruction::gate(gate.clone(), [QubitId(a), QubitId(b)]);
        inst.clbits = clbits.to_vec();
        out.apply(inst)?;
        Ok(())
    }
}

fn physical(layout: &Layout, q: QubitId) -> CompileResult<QubitId> {
    layout
        .physical(q)
        .map(QubitId)
        .ok_or(CompileError::Ir(tangle_ir::IrError::QubitNotFound {
            qubit: q,
            gate_name: None,
        }))
}

/// swap a,b as three direction-fixed cx gates.
fn emit_swap(
    out: &mut CircuitDag,
    coupling: &CouplingMap,
    a: u32,
    b: u32,
) -> CompileResult<()> {
    emit_cx(out, coupling, a, b)?;
    emit_cx(out, coupling, b, a)?;
    emit_cx(out, coupling, a, b)
}

/// cx control,target using the native direction, conjugating with
/// Hadamards when only target->control exists.
fn emit_cx(out: &mut CircuitDag, coupling: &CouplingMap, control: u32, target: u32) -> CompileResult<()> {
    if coupling.has_edge(control, target) {
        out.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(control),
            QubitId(target),
        ))?;
        return Ok(());
    }
    if coupling.has_edge(target, control) {
        emit_h(out, control, None, &[])?;
        emit_h(out, target, None, &[])?;
        out.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(target),
            QubitId(control),
        ))?;
        emit_h(out, control, None, &[])?;
        emit_h(out, target, None, &[])?;
        return Ok(());
    }
    Err(CompileError::DisconnectedCoupling {
        from: control,
        to: target,
    })
}

fn emit_h(
    out: &mut CircuitDag,
    wire: u32,
    condition: Option<&ClassicalCondition>,
    clbits: &[ClbitId],
) -> CompileResult<()> {
    let h = StandardGate::U2(
        ParameterExpression::constant(0.0),
        ParameterExpression::pi(),
    );
    emit_conditioned(out, h.into(), &[wire], condition, clbits)
}

fn emit_conditioned(
    out: &mut CircuitDag,
    gate: Gate,
    wires: &[u32],
    condition: Option<&ClassicalCondition>,
    clbits: &[ClbitId],
) -> CompileResult<()> {
    let gate = match condition {
        Some(c) => gate.with_condition(c.clone()),
        None => gate,
    };
    let mut inst = Instruction::gate(gate, wires.iter().map(|&w| QubitId(w)));
    if condition.is_some() {
        inst.clbits = clbits.to_vec();
    }
    out.apply(inst)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u1_pi(q: u32) -> Instruction {
        Instruction::single_qubit_gate(StandardGate::U1(ParameterExpression::pi()), QubitId(q))
    }

    fn mapped(dag: &mut CircuitDag, coupling: CouplingMap) -> PropertySet {
        let mut props = PropertySet::new().with_coupling_map(coupling);
        SwapMapper.run(dag, &mut props).unwrap();
        props
    }

    #[test]
    fn adjacent_gates_pass_through() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("qr", 2);
        dag.apply(u1_pi(0)).unwrap();
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(0),
            QubitId(1),
        ))
        .unwrap();

        mapped(&mut dag, CouplingMap::linear(3));
        assert_eq!(dag.num_ops(), 2);
        assert_eq!(dag.level(), CircuitLevel::Physical);
        // Rebuilt over the physical register.
        assert_eq!(dag.num_qubits(), 3);
        assert_eq!(dag.qregs()[0].name, "q");
    }

    #[test]
    fn distant_gate_gets_a_swap_chain() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("qr", 3);
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(0),
            QubitId(2),
        ))
        .unwrap();

        let props = mapped(&mut dag, CouplingMap::linear(3));

        // One swap (three cx, direction-fixed) plus the gate itself.
        assert!(dag.count_ops("cx") >= 2);
        // Logical 0 migrated to physical 1.
        let layout = props.layout.unwrap();
        assert_eq!(layout.physical(QubitId(0)), Some(1));
        assert_eq!(layout.physical(QubitId(1)), Some(0));
    }

    #[test]
    fn reverse_edge_conjugates_with_hadamards() {
        // Only 1 -> 0 exists; cx 0,1 needs the wrap.
        let mut map = CouplingMap::new(2);
        map.add_edge(1, 0).unwrap();
        map.freeze();

        let mut dag = CircuitDag::new();
        dag.add_qreg("qr", 2);
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(0),
            QubitId(1),
        ))
        .unwrap();

        mapped(&mut dag, map);

        let names: Vec<&str> = dag.topological_ops().map(|(_, i)| i.name()).collect();
        assert_eq!(names, ["u2", "u2", "cx", "u2", "u2"]);
        let cx = dag
            .topological_ops()
            .find(|(_, i)| i.name() == "cx")
            .unwrap()
            .1
            .clone();
        assert_eq!(cx.qubits, vec![QubitId(1), QubitId(0)]);
    }

    #[test]
    fn symmetric_gate_flips_to_the_native_direction() {
        use tangle_ir::NamedGate;

        // Only 1 -> 0 exists; cz 0,1 lands on the native direction
        // without any Hadamard wrap.
        let mut map = CouplingMap::new(2);
        map.add_edge(1, 0).unwrap();
        map.freeze();

        let mut dag = CircuitDag::new();
        dag.add_qreg("qr", 2);
        dag.apply(Instruction::gate(
            Gate::named(NamedGate::new("cz", 2)),
            [QubitId(0), QubitId(1)],
        ))
        .unwrap();

        mapped(&mut dag, map);

        assert_eq!(dag.num_ops(), 1);
        let (_, cz) = dag.topological_ops().next().unwrap();
        assert_eq!(cz.name(), "cz");
        assert_eq!(cz.qubits, vec![QubitId(1), QubitId(0)]);
    }

    #[test]
    fn measurement_keeps_classical_target() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("qr", 3);
        dag.add_creg("c", 3);
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(0),
            QubitId(2),
        ))
        .unwrap();
        dag.apply(Instruction::measure(QubitId(0), ClbitId(0)))
            .unwrap();

        let props = mapped(&mut dag, CouplingMap::linear(3));
        let layout = props.layout.unwrap();

        let measure = dag
            .topological_ops()
            .find(|(_, i)| i.is_measure())
            .unwrap()
            .1
            .clone();
        // Logical 0 moved, but its measurement follows it and still
        // writes c[0].
        assert_eq!(measure.qubits[0], physical(&layout, QubitId(0)).unwrap());
        assert_eq!(measure.clbits[0], ClbitId(0));
    }

    #[test]
    fn disconnected_map_errors() {
        let mut map = CouplingMap::new(4);
        map.add_edge(0, 1).unwrap();
        map.add_edge(2, 3).unwrap();
        map.freeze();

        let mut dag = CircuitDag::new();
        dag.add_qreg("qr", 4);
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(0),
            QubitId(3),
        ))
        .unwrap();

        let mut props = PropertySet::new().with_coupling_map(map);
        let err = SwapMapper.run(&mut dag, &mut props).unwrap_err();
        assert!(matches!(err, CompileError::DisconnectedCoupling { .. }));
    }

    #[test]
    fn too_wide_circuit_errors() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("qr", 5);

        let mut props = PropertySet::new().with_coupling_map(CouplingMap::linear(3));
        let err = SwapMapper.run(&mut dag, &mut props).unwrap_err();
        assert!(matches!(
            err,
            CompileError::CircuitTooWide {
                needed: 5,
                available: 3
            }
        ));
    }

    #[test]
    fn missing_coupling_map_errors() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("qr", 1);
        let mut props = PropertySet::new();
        assert!(!SwapMapper.should_run(&dag, &props));
        let err = SwapMapper.run(&mut dag, &mut props).unwrap_err();
        assert!(matches!(err, CompileError::MissingCouplingMap));
    }
}

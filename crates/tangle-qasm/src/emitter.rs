//! QASM 2.0 emitter.
//!
//! Output is bit-exact where compatibility matters: fixed header and
//! include lines, register declarations in declaration order, one
//! statement per operation in deterministic topological order. Symbolic
//! parameters render as their literal expression text; fully numeric
//! parameters render as full-precision decimal literals.

use tangle_ir::{qubit, CircuitDag, ClbitId, Instruction, InstructionKind, IrError, QubitId};

use crate::error::QasmResult;

/// Emit a circuit DAG as QASM 2.0 source text.
pub fn emit(dag: &CircuitDag) -> QasmResult<String> {
    let mut emitter = Emitter::new(dag);
    emitter.emit_circuit()
}

struct Emitter<'a> {
    dag: &'a CircuitDag,
    output: String,
}

impl<'a> Emitter<'a> {
    fn new(dag: &'a CircuitDag) -> Self {
        Self {
            dag,
            output: String::new(),
        }
    }

    fn emit_circuit(&mut self) -> QasmResult<String> {
        self.writeln("OPENQASM 2.0;");
        self.writeln("include \"qelib1.inc\";");

        for reg in self.dag.qregs() {
            self.writeln(&format!("qreg {}[{}];", reg.name, reg.size));
        }
        for reg in self.dag.cregs() {
            self.writeln(&format!("creg {}[{}];", reg.name, reg.size));
        }

        for (_, instruction) in self.dag.topological_ops() {
            self.emit_instruction(instruction)?;
        }

        Ok(std::mem::take(&mut self.output))
    }

    fn emit_instruction(&mut self, instruction: &Instruction) -> QasmResult<()> {
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let prefix = match &gate.condition {
                    Some(c) => format!("if({}=={}) ", c.register, c.value),
                    None => String::new(),
                };
                let params = gate
                    .kind
                    .parameters()
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                let qubits = self.qubit_list(&instruction.qubits)?;

                if params.is_empty() {
                    self.writeln(&format!("{prefix}{} {qubits};", gate.name()));
                } else {
                    self.writeln(&format!("{prefix}{}({params}) {qubits};", gate.name()));
                }
            }

            InstructionKind::Measure => {
                let q = self.qubit_label(instruction.qubits[0])?;
                let c = self.clbit_label(instruction.clbits[0])?;
                self.writeln(&format!("measure {q} -> {c};"));
            }

            InstructionKind::Reset => {
                let q = self.qubit_label(instruction.qubits[0])?;
                self.writeln(&format!("reset {q};"));
            }

            InstructionKind::Barrier => {
                let qubits = self.qubit_list(&instruction.qubits)?;
                self.writeln(&format!("barrier {qubits};"));
            }
        }

        Ok(())
    }

    fn qubit_label(&self, q: QubitId) -> QasmResult<String> {
        qubit::locate(self.dag.qregs(), q.0)
            .map(|(name, idx)| format!("{name}[{idx}]"))
            .ok_or_else(|| {
                IrError::QubitNotFound {
                    qubit: q,
                    gate_name: None,
                }
                .into()
            })
    }

    fn clbit_label(&self, c: ClbitId) -> QasmResult<String> {
        qubit::locate(self.dag.cregs(), c.0)
            .map(|(name, idx)| format!("{name}[{idx}]"))
            .ok_or_else(|| {
                IrError::ClbitNotFound {
                    clbit: c,
                    gate_name: None,
                }
                .into()
            })
    }

    fn qubit_list(&self, qubits: &[QubitId]) -> QasmResult<String> {
        let labels: QasmResult<Vec<String>> =
            qubits.iter().map(|&q| self.qubit_label(q)).collect();
        Ok(labels?.join(","))
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

//! Structured output for compiled circuits.
//!
//! [`CompiledProgram`] is a flat, serde-friendly view of a lowered
//! [`CircuitDag`]: registers plus instructions in execution order.
//! Numeric parameters serialize as JSON numbers and symbolic parameters
//! as their expression text, so a program survives a JSON round trip
//! without losing either form.

use serde::{Deserialize, Serialize};

use tangle_ir::{
    CircuitDag, ClassicalCondition, ClbitId, Gate, Instruction, InstructionKind,
    ParameterExpression, QubitId, StandardGate,
};

use crate::error::{CompileError, CompileResult};

/// A gate parameter in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompiledParam {
    /// Fully resolved angle.
    Numeric(f64),
    /// Expression text, e.g. `-0.1 + 0.55*pi`.
    Symbolic(String),
}

impl CompiledParam {
    fn from_expression(expr: &ParameterExpression) -> Self {
        match expr.literal_value() {
            Some(v) => CompiledParam::Numeric(v),
            None => CompiledParam::Symbolic(expr.to_string()),
        }
    }

    fn to_expression(&self) -> CompileResult<ParameterExpression> {
        match self {
            CompiledParam::Numeric(v) => Ok(ParameterExpression::constant(*v)),
            CompiledParam::Symbolic(text) => {
                let expression = tangle_qasm::parse_expression(text)?;
                Ok(expression.to_parameter())
            }
        }
    }
}

/// One instruction of a compiled program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledInstruction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<CompiledParam>,
    pub qubits: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clbits: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<(String, u64)>,
}

/// A register declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledRegister {
    pub name: String,
    pub size: u32,
}

/// Serializable form of a lowered circuit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub qregs: Vec<CompiledRegister>,
    pub cregs: Vec<CompiledRegister>,
    pub instructions: Vec<CompiledInstruction>,
}

impl CompiledProgram {
    /// Flatten a dag into execution order.
    pub fn from_dag(dag: &CircuitDag) -> Self {
        let qregs = dag
            .qregs()
            .iter()
            .map(|r| CompiledRegister {
                name: r.name.clone(),
                size: r.size,
            })
            .collect();
        let cregs = dag
            .cregs()
            .iter()
            .map(|r| CompiledRegister {
                name: r.name.clone(),
                size: r.size,
            })
            .collect();

        let instructions = dag
            .topological_ops()
            .map(|(_, instruction)| flatten(instruction))
            .collect();

        CompiledProgram {
            qregs,
            cregs,
            instructions,
        }
    }

    /// Rebuild a dag. Only basis-level instructions are accepted.
    pub fn into_dag(self) -> CompileResult<CircuitDag> {
        let mut dag = CircuitDag::new();
        for reg in &self.qregs {
            dag.add_qreg(reg.name.clone(), reg.size);
        }
        for reg in &self.cregs {
            dag.add_creg(reg.name.clone(), reg.size);
        }
        for compiled in &self.instructions {
            let instruction = rebuild(compiled, &dag)?;
            dag.apply(instruction)?;
        }
        Ok(dag)
    }
}

fn flatten(instruction: &Instruction) -> CompiledInstruction {
    let (params, condition) = match &instruction.kind {
        InstructionKind::Gate(gate) => (
            gate.kind
                .parameters()
                .iter()
                .map(|p| CompiledParam::from_expression(p))
                .collect(),
            gate.condition
                .as_ref()
                .map(|c| (c.register.clone(), c.value)),
        ),
        _ => (Vec::new(), None),
    };

    // Condition clbits exist only for dag ordering.
    let clbits = if condition.is_some() {
        Vec::new()
    } else {
        instruction.clbits.iter().map(|c| c.0).collect()
    };

    CompiledInstruction {
        name: instruction.name().to_string(),
        params,
        qubits: instruction.qubits.iter().map(|q| q.0).collect(),
        clbits,
        condition,
    }
}

fn rebuild(compiled: &CompiledInstruction, dag: &CircuitDag) -> CompileResult<Instruction> {
    let qubits: Vec<QubitId> = compiled.qubits.iter().map(|&q| QubitId(q)).collect();
    let clbits: Vec<ClbitId> = compiled.clbits.iter().map(|&c| ClbitId(c)).collect();

    match compiled.name.as_str() {
        "measure" => {
            let (&q, &c) = match (qubits.first(), clbits.first()) {
                (Some(q), Some(c)) => (q, c),
                _ => {
                    return Err(CompileError::QubitCount {
                        name: "measure".into(),
                        expected: 1,
                        got: qubits.len(),
                    });
                }
            };
            Ok(Instruction::measure(q, c))
        }
        "reset" => {
            let &q = qubits.first().ok_or_else(|| CompileError::QubitCount {
                name: "reset".into(),
                expected: 1,
                got: 0,
            })?;
            Ok(Instruction::reset(q))
        }
        "barrier" => Ok(Instruction::barrier(qubits)),
        name => {
            let mut params = Vec::with_capacity(compiled.params.len());
            for p in &compiled.params {
                params.push(p.to_expression()?);
            }
            let standard = standard_gate(name, params, qubits.len())?;
            let mut gate = Gate::standard(standard);
            if let Some((register, value)) = &compiled.condition {
                gate = gate.with_condition(ClassicalCondition::new(register.clone(), *value));
            }
            let conditioned = gate.condition.is_some();
            let mut instruction = Instruction::gate(gate, qubits);
            if conditioned {
                instruction.clbits = condition_clbits(&instruction, dag)?;
            }
            Ok(instruction)
        }
    }
}

fn standard_gate(
    name: &str,
    mut params: Vec<ParameterExpression>,
    num_qubits: usize,
) -> CompileResult<StandardGate> {
    let check = |expected_params: usize, expected_qubits: usize| -> CompileResult<()> {
        if params.len() != expected_params {
            return Err(CompileError::ParameterCount {
                name: name.into(),
                expected: expected_params,
                got: params.len(),
            });
        }
        if num_qubits != expected_qubits {
            return Err(CompileError::QubitCount {
                name: name.into(),
                expected: expected_qubits,
                got: num_qubits,
            });
        }
        Ok(())
    };

    match name {
        "u1" => {
            check(1, 1)?;
            Ok(StandardGate::U1(params.remove(0)))
        }
        "u2" => {
            check(2, 1)?;
            let lambda = params.remove(1);
            Ok(StandardGate::U2(params.remove(0), lambda))
        }
        "u3" => {
            check(3, 1)?;
            let lambda = params.remove(2);
            let phi = params.remove(1);
            Ok(StandardGate::U3(params.remove(0), phi, lambda))
        }
        "cx" => {
            check(0, 2)?;
            Ok(StandardGate::CX)
        }
        other => Err(CompileError::UnknownGate { name: other.into() }),
    }
}

/// Clbits of the condition register, attached for wire ordering.
fn condition_clbits(instruction: &Instruction, dag: &CircuitDag) -> CompileResult<Vec<ClbitId>> {
    let Some(condition) = instruction.as_gate().and_then(|g| g.condition.as_ref()) else {
        return Ok(Vec::new());
    };
    let reg = dag
        .creg(&condition.register)
        .ok_or_else(|| CompileError::UndeclaredRegister {
            name: condition.register.clone(),
        })?;
    Ok((reg.start..reg.start + reg.size).map(ClbitId).collect())
}

//! Recursive expansion of a parsed program into basis-set instructions.
//!
//! The unroller consumes the QASM syntax tree and produces a
//! [`CircuitDag`] whose gates all belong to the target basis. User gate
//! definitions expand recursively with actual parameters substituted for
//! formals; the builtins `U` and `CX` lower to `u3` and `cx`. A subset
//! of the `qelib1.inc` standard library is registered at construction so
//! programs including it resolve without reading a file.

use rustc_hash::FxHashMap;
use tracing::debug;

use tangle_ir::{
    CircuitDag, ClassicalCondition, ClbitId, Gate, Instruction, NamedGate, ParameterExpression,
    QubitId, StandardGate,
};
use tangle_qasm::ast::{BitRef, Condition, GateCall, GateDef, QubitRef, Statement};
use tangle_qasm::Program;

use crate::coupling::BasisGates;
use crate::error::{CompileError, CompileResult};

/// The `qelib1.inc` subset the unroller ships built in. Everything is
/// defined in terms of the `U`/`CX` builtins or gates defined earlier in
/// the listing, exactly as the distributed include file does.
const QELIB1: &str = r#"
OPENQASM 2.0;
gate u3(theta,phi,lambda) q { U(theta,phi,lambda) q; }
gate u2(phi,lambda) q { U(pi/2,phi,lambda) q; }
gate u1(lambda) q { U(0,0,lambda) q; }
gate cx c,t { CX c,t; }
gate id a { U(0,0,0) a; }
gate x a { u3(pi,0,pi) a; }
gate y a { u3(pi,pi/2,pi/2) a; }
gate z a { u1(pi) a; }
gate h a { u2(0,pi) a; }
gate s a { u1(pi/2) a; }
gate sdg a { u1(-pi/2) a; }
gate t a { u1(pi/4) a; }
gate tdg a { u1(-pi/4) a; }
gate rx(theta) a { u3(theta,-pi/2,pi/2) a; }
gate ry(theta) a { u3(theta,0,0) a; }
gate rz(phi) a { u1(phi) a; }
gate cz a,b { h b; cx a,b; h b; }
gate cy a,b { sdg b; cx a,b; s b; }
gate ch a,b { h b; sdg b; cx a,b; h b; t b; cx a,b; t b; h b; s b; x b; s a; }
gate swap a,b { cx a,b; cx b,a; cx a,b; }
gate ccx a,b,c { h c; cx b,c; tdg c; cx a,c; t c; cx b,c; tdg c; cx a,c; t b; t c; h c; cx a,b; t a; tdg b; cx a,b; }
gate crz(lambda) a,b { u1(lambda/2) b; cx a,b; u1(-lambda/2) b; cx a,b; }
gate cu1(lambda) a,b { u1(lambda/2) a; cx a,b; u1(-lambda/2) b; cx a,b; u1(lambda/2) b; }
gate cu3(theta,phi,lambda) c,t { u1((lambda-phi)/2) t; cx c,t; u3(-theta/2,0,-(phi+lambda)/2) t; cx c,t; u3(theta/2,phi,0) t; }
"#;

/// A qubit or clbit operand before broadcasting: either one wire or a
/// whole register's contiguous range.
#[derive(Debug, Clone, Copy)]
enum Operand {
    Single(u32),
    Range { start: u32, size: u32 },
}

impl Operand {
    fn width(self) -> u32 {
        match self {
            Operand::Single(_) => 1,
            Operand::Range { size, .. } => size,
        }
    }

    /// The wire used by application `i` of a broadcast call.
    fn at(self, i: u32) -> u32 {
        match self {
            Operand::Single(w) => w,
            Operand::Range { start, .. } => start + i,
        }
    }
}

/// Expands programs against a target basis.
pub struct Unroller {
    basis: BasisGates,
    stdlib: FxHashMap<String, GateDef>,
}

impl Unroller {
    /// Build an unroller for the given basis, registering the embedded
    /// standard library.
    pub fn new(basis: BasisGates) -> CompileResult<Self> {
        let program = tangle_qasm::parse(QELIB1)?;
        let mut stdlib = FxHashMap::default();
        for statement in program.statements {
            if let Statement::GateDef(def) = statement {
                stdlib.insert(def.name.clone(), def);
            }
        }
        Ok(Self { basis, stdlib })
    }

    /// Expand a whole program into a circuit over the basis.
    pub fn unroll(&self, program: &Program) -> CompileResult<CircuitDag> {
        let mut state = UnrollState {
            unroller: self,
            dag: CircuitDag::new(),
            defs: self.stdlib.clone(),
            opaques: FxHashMap::default(),
            qregs: FxHashMap::default(),
            cregs: FxHashMap::default(),
            user_defined: Vec::new(),
        };

        for statement in &program.statements {
            state.process(statement)?;
        }

        Ok(state.dag)
    }
}

/// Per-unroll working state: the output DAG plus register and definition
/// tables built up in source order.
struct UnrollState<'a> {
    unroller: &'a Unroller,
    dag: CircuitDag,
    defs: FxHashMap<String, GateDef>,
    /// Opaque declarations: name to (parameter count, qubit count).
    opaques: FxHashMap<String, (usize, usize)>,
    /// Quantum registers: name to (flat start, size).
    qregs: FxHashMap<String, (u32, u32)>,
    /// Classical registers: name to (flat start, size).
    cregs: FxHashMap<String, (u32, u32)>,
    /// Gate names defined by the program itself (not the stdlib).
    user_defined: Vec<String>,
}

impl UnrollState<'_> {
    fn process(&mut self, statement: &Statement) -> CompileResult<()> {
        match statement {
            Statement::Include(file) => {
                // qelib1 is built in; other includes have nothing to add.
                debug!(file, "ignoring include");
                Ok(())
            }

            Statement::QRegDecl { name, size } => {
                self.check_register_name(name)?;
                let start = self.dag.add_qreg(name.clone(), *size);
                self.qregs.insert(name.clone(), (start.0, *size));
                Ok(())
            }

            Statement::CRegDecl { name, size } => {
                self.check_register_name(name)?;
                let start = self.dag.add_creg(name.clone(), *size);
                self.cregs.insert(name.clone(), (start.0, *size));
                Ok(())
            }

            Statement::GateDef(def) => {
                if self.user_defined.iter().any(|n| n == &def.name) {
                    return Err(CompileError::DuplicateDefinition {
                        name: def.name.clone(),
                    });
                }
                if self.defs.contains_key(&def.name) {
                    debug!(name = %def.name, "program definition shadows the standard library");
                }
                self.user_defined.push(def.name.clone());
                self.defs.insert(def.name.clone(), def.clone());
                Ok(())
            }

            Statement::OpaqueDef {
                name,
                params,
                qubits,
            } => {
                self.opaques
                    .insert(name.clone(), (params.len(), qubits.len()));
                Ok(())
            }

            Statement::Gate(call) => self.apply_call(call),

            Statement::Measure {
                qubit,
                bit,
                condition,
            } => {
                if condition.is_some() {
                    return Err(CompileError::UnsupportedCondition { op: "measure" });
                }
                let q = self.resolve_qubit(qubit)?;
                let c = self.resolve_clbit(bit)?;
                if q.width() != c.width() {
                    return Err(CompileError::BroadcastWidth {
                        name: "measure".into(),
                        widths: vec![q.width(), c.width()],
                    });
                }
                for i in 0..q.width() {
                    self.dag
                        .apply(Instruction::measure(QubitId(q.at(i)), ClbitId(c.at(i))))?;
                }
                Ok(())
            }

            Statement::Reset { qubit, condition } => {
                if condition.is_some() {
                    return Err(CompileError::UnsupportedCondition { op: "reset" });
                }
                let q = self.resolve_qubit(qubit)?;
                for i in 0..q.width() {
                    self.dag.apply(Instruction::reset(QubitId(q.at(i))))?;
                }
                Ok(())
            }

            Statement::Barrier { qubits } => {
                let mut wires: Vec<QubitId> = Vec::new();
                for qref in qubits {
                    let operand = self.resolve_qubit(qref)?;
                    for i in 0..operand.width() {
                        let wire = QubitId(operand.at(i));
                        if !wires.contains(&wire) {
                            wires.push(wire);
                        }
                    }
                }
                self.dag.apply(Instruction::barrier(wires))?;
                Ok(())
            }
        }
    }

    fn check_register_name(&self, name: &str) -> CompileResult<()> {
        if self.qregs.contains_key(name) || self.cregs.contains_key(name) {
            return Err(CompileError::DuplicateDefinition { name: name.into() });
        }
        Ok(())
    }

    fn resolve_qubit(&self, qref: &QubitRef) -> CompileResult<Operand> {
        let &(start, size) =
            self.qregs
                .get(&qref.register)
                .ok_or_else(|| CompileError::UndeclaredRegister {
                    name: qref.register.clone(),
                })?;
        match qref.index {
            Some(i) if i >= size => Err(CompileError::IndexOutOfRange {
                register: qref.register.clone(),
                index: i,
            }),
            Some(i) => Ok(Operand::Single(start + i)),
            None => Ok(Operand::Range { start, size }),
        }
    }

    fn resolve_clbit(&self, bref: &BitRef) -> CompileResult<Operand> {
        let &(start, size) =
            self.cregs
                .get(&bref.register)
                .ok_or_else(|| CompileError::UndeclaredRegister {
                    name: bref.register.clone(),
                })?;
        match bref.index {
            Some(i) if i >= size => Err(CompileError::IndexOutOfRange {
                register: bref.register.clone(),
                index: i,
            }),
            Some(i) => Ok(Operand::Single(start + i)),
            None => Ok(Operand::Range { start, size }),
        }
    }

    /// Resolve operands, apply the broadcasting rules, and expand each
    /// resulting application.
    fn apply_call(&mut self, call: &GateCall) -> CompileResult<()> {
        let params: Vec<ParameterExpression> =
            call.params.iter().map(|e| e.to_parameter()).collect();

        let operands: Vec<Operand> = call
            .qubits
            .iter()
            .map(|qref| self.resolve_qubit(qref))
            .collect::<CompileResult<_>>()?;

        // Register operands must agree on width; singles broadcast.
        let widths: Vec<u32> = operands.iter().map(|o| o.width()).collect();
        let broadcast = widths.iter().copied().filter(|&w| w > 1).max().unwrap_or(1);
        if widths.iter().any(|&w| w != 1 && w != broadcast) {
            return Err(CompileError::BroadcastWidth {
                name: call.name.clone(),
                widths,
            });
        }

        let (condition, cond_clbits) = match &call.condition {
            Some(cond) => {
                let (clbits, condition) = self.resolve_condition(cond)?;
                (Some(condition), clbits)
            }
            None => (None, vec![]),
        };

        let mut stack = Vec::new();
        for i in 0..broadcast {
            let qubits: Vec<QubitId> = operands.iter().map(|o| QubitId(o.at(i))).collect();
            self.expand(
                &call.name,
                &params,
                &qubits,
                condition.as_ref(),
                &cond_clbits,
                &mut stack,
            )?;
        }
        Ok(())
    }

    /// Condition register lookup; the register's clbits ride on each
    /// conditioned instruction so measurements stay ordered against it.
    fn resolve_condition(
        &self,
        cond: &Condition,
    ) -> CompileResult<(Vec<ClbitId>, ClassicalCondition)> {
        let &(start, size) =
            self.cregs
                .get(&cond.register)
                .ok_or_else(|| CompileError::UndeclaredRegister {
                    name: cond.register.clone(),
                })?;
        let clbits = (start..start + size).map(ClbitId).collect();
        Ok((clbits, ClassicalCondition::new(&cond.register, cond.value)))
    }

    /// Expand one concrete application down to basis instructions.
    fn expand(
        &mut self,
        name: &str,
        params: &[ParameterExpression],
        qubits: &[QubitId],
        condition: Option<&ClassicalCondition>,
        cond_clbits: &[ClbitId],
        stack: &mut Vec<String>,
    ) -> CompileResult<()> {
        // Builtins lower straight into the basis vocabulary.
        if name == "U" {
            check_counts(name, 3, params.len(), 1, qubits.len())?;
            let gate = StandardGate::U3(
                params[0].simplify(),
                params[1].simplify(),
                params[2].simplify(),
            );
            return self.emit(gate.into(), qubits, condition, cond_clbits);
        }
        if name == "CX" {
            check_counts(name, 0, params.len(), 2, qubits.len())?;
            return self.emit(StandardGate::CX.into(), qubits, condition, cond_clbits);
        }

        if self.unroller.basis.contains(name) {
            return self.emit_basis(name, params, qubits, condition, cond_clbits);
        }

        if let Some(def) = self.defs.get(name).cloned() {
            check_counts(name, def.params.len(), params.len(), def.qubits.len(), qubits.len())?;
            if stack.iter().any(|n| n == name) {
                return Err(CompileError::RecursiveDefinition { name: name.into() });
            }
            stack.push(name.to_string());

            let formal_qubits: FxHashMap<&str, QubitId> = def
                .qubits
                .iter()
                .map(String::as_str)
                .zip(qubits.iter().copied())
                .collect();

            for body_call in &def.body {
                let actual_params: Vec<ParameterExpression> = body_call
                    .params
                    .iter()
                    .map(|e| {
                        let mut expr = e.to_parameter();
                        for (formal, actual) in def.params.iter().zip(params) {
                            expr = expr.substitute(formal, actual);
                        }
                        expr
                    })
                    .collect();

                let actual_qubits: Vec<QubitId> = body_call
                    .qubits
                    .iter()
                    .map(|qref| {
                        formal_qubits.get(qref.register.as_str()).copied().ok_or_else(
                            || CompileError::UndeclaredRegister {
                                name: qref.register.clone(),
                            },
                        )
                    })
                    .collect::<CompileResult<_>>()?;

                self.expand(
                    &body_call.name,
                    &actual_params,
                    &actual_qubits,
                    condition,
                    cond_clbits,
                    stack,
                )?;
            }

            stack.pop();
            return Ok(());
        }

        // Opaque gates outside the basis cannot be expanded.
        Err(CompileError::UnknownGate { name: name.into() })
    }

    /// Emit a gate that is already in the basis.
    fn emit_basis(
        &mut self,
        name: &str,
        params: &[ParameterExpression],
        qubits: &[QubitId],
        condition: Option<&ClassicalCondition>,
        cond_clbits: &[ClbitId],
    ) -> CompileResult<()> {
        let gate = match name {
            "u1" => {
                check_counts(name, 1, params.len(), 1, qubits.len())?;
                Gate::standard(StandardGate::U1(params[0].simplify()))
            }
            "u2" => {
                check_counts(name, 2, params.len(), 1, qubits.len())?;
                Gate::standard(StandardGate::U2(params[0].simplify(), params[1].simplify()))
            }
            "u3" => {
                check_counts(name, 3, params.len(), 1, qubits.len())?;
                Gate::standard(StandardGate::U3(
                    params[0].simplify(),
                    params[1].simplify(),
                    params[2].simplify(),
                ))
            }
            "cx" => {
                check_counts(name, 0, params.len(), 2, qubits.len())?;
                Gate::standard(StandardGate::CX)
            }
            _ => {
                // Arity-check named basis gates against whatever
                // declaration we have for them.
                let known = self
                    .defs
                    .get(name)
                    .map(|d| (d.params.len(), d.qubits.len()))
                    .or_else(|| self.opaques.get(name).copied());
                if let Some((np, nq)) = known {
                    check_counts(name, np, params.len(), nq, qubits.len())?;
                }
                #[allow(clippy::cast_possible_truncation)]
                let named = NamedGate::new(name, qubits.len() as u32)
                    .with_params(params.iter().map(ParameterExpression::simplify).collect());
                Gate::named(named)
            }
        };
        self.emit(gate, qubits, condition, cond_clbits)
    }

    fn emit(
        &mut self,
        gate: Gate,
        qubits: &[QubitId],
        condition: Option<&ClassicalCondition>,
        cond_clbits: &[ClbitId],
    ) -> CompileResult<()> {
        let gate = match condition {
            Some(c) => gate.with_condition(c.clone()),
            None => gate,
        };
        let mut instruction = Instruction::gate(gate, qubits.iter().copied());
        instruction.clbits = cond_clbits.to_vec();
        self.dag.apply(instruction)?;
        Ok(())
    }
}

fn check_counts(
    name: &str,
    expected_params: usize,
    got_params: usize,
    expected_qubits: usize,
    got_qubits: usize,
) -> CompileResult<()> {
    if expected_params != got_params {
        return Err(CompileError::ParameterCount {
            name: name.into(),
            expected: expected_params,
            got: got_params,
        });
    }
    if expected_qubits != got_qubits {
        return Err(CompileError::QubitCount {
            name: name.into(),
            expected: expected_qubits,
            got: got_qubits,
        });
    }
    Ok(())
}

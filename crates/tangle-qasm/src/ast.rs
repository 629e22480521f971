//! Abstract Syntax Tree for `OpenQASM` 2.0.
//!
//! Gate definitions are kept in the AST rather than expanded here; the
//! unroller owns expansion, cycle detection, and basis selection.

use serde::{Deserialize, Serialize};

use tangle_ir::{MathFn, ParameterExpression};

/// A complete QASM 2.0 program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// QASM version string (e.g., "2.0").
    pub version: String,
    /// Statements in source order.
    pub statements: Vec<Statement>,
}

/// A statement in a QASM 2.0 program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    /// Include statement: `include "qelib1.inc";`
    Include(String),

    /// Quantum register declaration: `qreg name[n];`
    QRegDecl { name: String, size: u32 },

    /// Classical register declaration: `creg name[n];`
    CRegDecl { name: String, size: u32 },

    /// Gate definition: `gate name(params) qubits { body }`
    GateDef(GateDef),

    /// Opaque gate declaration (no body): `opaque name(params) qubits;`
    OpaqueDef {
        name: String,
        params: Vec<String>,
        qubits: Vec<String>,
    },

    /// Gate application, optionally conditioned by an enclosing `if`.
    Gate(GateCall),

    /// Measurement: `measure q -> c;`
    Measure {
        qubit: QubitRef,
        bit: BitRef,
        condition: Option<Condition>,
    },

    /// Reset: `reset q;`
    Reset {
        qubit: QubitRef,
        condition: Option<Condition>,
    },

    /// Barrier: `barrier q, r;`
    Barrier { qubits: Vec<QubitRef> },
}

/// A user gate definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDef {
    /// Gate name.
    pub name: String,
    /// Formal parameter names.
    pub params: Vec<String>,
    /// Formal qubit argument names.
    pub qubits: Vec<String>,
    /// Body: gate calls over the formal names. Barriers are legal in
    /// bodies and ignored during expansion.
    pub body: Vec<GateCall>,
}

/// A gate call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateCall {
    /// Gate name. The builtins `U` and `CX` keep their uppercase names.
    pub name: String,
    /// Parameter expressions.
    pub params: Vec<Expression>,
    /// Qubit arguments; whole-register arguments broadcast.
    pub qubits: Vec<QubitRef>,
    /// Classical condition from an enclosing `if (creg == n)`.
    pub condition: Option<Condition>,
}

/// An `if (creg == value)` guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub register: String,
    pub value: u64,
}

/// Reference to a qubit register element or a whole register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QubitRef {
    pub register: String,
    /// `None` refers to the entire register (broadcast).
    pub index: Option<u32>,
}

impl QubitRef {
    /// Reference a single element.
    pub fn single(register: impl Into<String>, index: u32) -> Self {
        QubitRef {
            register: register.into(),
            index: Some(index),
        }
    }

    /// Reference an entire register.
    pub fn register(register: impl Into<String>) -> Self {
        QubitRef {
            register: register.into(),
            index: None,
        }
    }
}

/// Reference to a classical bit or a whole classical register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitRef {
    pub register: String,
    /// `None` refers to the entire register (broadcast).
    pub index: Option<u32>,
}

impl BitRef {
    pub fn single(register: impl Into<String>, index: u32) -> Self {
        BitRef {
            register: register.into(),
            index: Some(index),
        }
    }

    pub fn register(register: impl Into<String>) -> Self {
        BitRef {
            register: register.into(),
            index: None,
        }
    }
}

/// A parameter expression as parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Integer literal.
    Int(u64),
    /// Float literal.
    Float(f64),
    /// Formal parameter name (inside gate bodies).
    Identifier(String),
    /// Pi constant.
    Pi,
    /// Negation.
    Neg(Box<Expression>),
    /// Binary operation.
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    /// Unary function call: `sin(x)` etc.
    FnCall { func: MathFn, arg: Box<Expression> },
}

/// Binary operators. Power is right-associative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Expression {
    /// Convert to an IR parameter expression. Identifiers become free
    /// symbols; the unroller substitutes actuals for formals.
    pub fn to_parameter(&self) -> ParameterExpression {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Expression::Int(v) => ParameterExpression::Constant(*v as f64),
            Expression::Float(v) => ParameterExpression::Constant(*v),
            Expression::Identifier(name) => ParameterExpression::Symbol(name.clone()),
            Expression::Pi => ParameterExpression::Pi,
            Expression::Neg(e) => -e.to_parameter(),
            Expression::BinOp { left, op, right } => {
                let l = left.to_parameter();
                let r = right.to_parameter();
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Pow => ParameterExpression::Pow(Box::new(l), Box::new(r)),
                }
            }
            Expression::FnCall { func, arg } => {
                ParameterExpression::call(*func, arg.to_parameter())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn expression_to_parameter() {
        let expr = Expression::BinOp {
            left: Box::new(Expression::Pi),
            op: BinOp::Div,
            right: Box::new(Expression::Int(2)),
        };
        let p = expr.to_parameter();
        assert!((p.as_f64().unwrap() - PI / 2.0).abs() < 1e-10);
        assert_eq!(p.to_string(), "pi/2");
    }

    #[test]
    fn identifier_becomes_symbol() {
        let expr = Expression::Identifier("theta".into());
        let p = expr.to_parameter();
        assert!(p.is_symbolic());
    }
}

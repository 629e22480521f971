//! Gate types.
//!
//! After unrolling, circuits carry only the target basis vocabulary.
//! The common `{cx, u1, u2, u3}` basis gets typed variants so the
//! optimizer can pattern-match angles; anything else rides through as a
//! named gate with its parameter list.

use serde::{Deserialize, Serialize};

use crate::parameter::ParameterExpression;

/// Basis gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Relative phase rotation u1(λ), diagonal.
    U1(ParameterExpression),
    /// Single Euler pair u2(φ, λ) = u3(π/2, φ, λ).
    U2(ParameterExpression, ParameterExpression),
    /// General single-qubit gate u3(θ, φ, λ).
    U3(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),
    /// Controlled-X, control first.
    CX,
}

impl StandardGate {
    /// The gate name as emitted in output text.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::U1(_) => "u1",
            StandardGate::U2(_, _) => "u2",
            StandardGate::U3(_, _, _) => "u3",
            StandardGate::CX => "cx",
        }
    }

    /// Number of qubit operands.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::U1(_) | StandardGate::U2(_, _) | StandardGate::U3(_, _, _) => 1,
            StandardGate::CX => 2,
        }
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::U1(l) => vec![l],
            StandardGate::U2(p, l) => vec![p, l],
            StandardGate::U3(t, p, l) => vec![t, p, l],
            StandardGate::CX => vec![],
        }
    }
}

/// A named gate outside the typed basis vocabulary.
///
/// Produced when the target basis set contains names beyond
/// `{cx, u1, u2, u3}`; the pipeline treats these opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedGate {
    pub name: String,
    pub num_qubits: u32,
    pub params: Vec<ParameterExpression>,
}

impl NamedGate {
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            params: vec![],
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Vec<ParameterExpression>) -> Self {
        self.params = params;
        self
    }
}

/// Standard or opaque named gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    Standard(StandardGate),
    Named(NamedGate),
}

impl GateKind {
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Named(g) => &g.name,
        }
    }

    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Named(g) => g.num_qubits,
        }
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            GateKind::Standard(g) => g.parameters(),
            GateKind::Named(g) => g.params.iter().collect(),
        }
    }
}

/// Classical condition attached to a conditioned gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// Name of the classical register compared.
    pub register: String,
    /// Value the register must hold for the gate to apply.
    pub value: u64,
}

impl ClassicalCondition {
    pub fn new(register: impl Into<String>, value: u64) -> Self {
        Self {
            register: register.into(),
            value,
        }
    }
}

/// A gate application, optionally classically conditioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub kind: GateKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl Gate {
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            condition: None,
        }
    }

    pub fn named(gate: NamedGate) -> Self {
        Self {
            kind: GateKind::Named(gate),
            condition: None,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

impl From<NamedGate> for Gate {
    fn from(gate: NamedGate) -> Self {
        Gate::named(gate)
    }
}

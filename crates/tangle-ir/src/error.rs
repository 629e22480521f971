//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Math-domain violation beyond tolerance during expression evaluation.
    #[error("domain error: {func}({arg}) is outside the function's domain")]
    ExpressionDomain {
        /// The function whose domain was violated.
        func: &'static str,
        /// The offending argument value.
        arg: f64,
    },

    /// Division by zero during expression evaluation.
    #[error("division by zero in parameter expression")]
    DivisionByZero,

    /// Expression references a parameter with no binding.
    #[error("parameter '{name}' is unbound")]
    UnboundParameter {
        /// The unbound parameter name.
        name: String,
    },

    /// Qubit not found in circuit.
    #[error("qubit {qubit:?} not found in circuit{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("classical bit {clbit:?} not found in circuit{}", format_gate_context(.gate_name))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Invalid DAG structure.
    #[error("invalid DAG structure: {0}")]
    InvalidDag(String),

    /// Invalid node index.
    #[error("invalid node index")]
    InvalidNode,

    /// Gate applied to the wrong number of qubits.
    #[error("gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Duplicate qubit in operation.
    #[error("duplicate qubit {qubit:?} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;

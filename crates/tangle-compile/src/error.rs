//! Error types for the compilation pipeline.

use thiserror::Error;

/// Errors raised while unrolling, mapping, or optimizing a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// A gate call names something with no definition and outside the
    /// target basis.
    #[error("unknown gate '{name}'")]
    UnknownGate {
        /// The unresolved gate name.
        name: String,
    },

    /// Gate definitions reference each other in a cycle.
    #[error("recursive gate definition '{name}'")]
    RecursiveDefinition {
        /// The definition whose expansion revisited itself.
        name: String,
    },

    /// Gate call carries the wrong number of parameters.
    #[error("gate '{name}' takes {expected} parameter(s), got {got}")]
    ParameterCount {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Gate call carries the wrong number of qubit operands.
    #[error("gate '{name}' acts on {expected} qubit(s), got {got}")]
    QubitCount {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Register operands of a broadcast call have conflicting widths.
    #[error("mismatched register widths in call to '{name}': {widths:?}")]
    BroadcastWidth {
        name: String,
        widths: Vec<u32>,
    },

    /// A statement references a register that was never declared.
    #[error("register '{name}' is not declared")]
    UndeclaredRegister {
        name: String,
    },

    /// A subscript falls outside its register.
    #[error("index {index} out of range for register '{register}'")]
    IndexOutOfRange {
        register: String,
        index: u32,
    },

    /// A register or gate name is declared twice.
    #[error("'{name}' is already defined")]
    DuplicateDefinition {
        name: String,
    },

    /// Classical conditions are only supported on gate operations.
    #[error("classical condition is not supported on '{op}'")]
    UnsupportedCondition {
        op: &'static str,
    },

    /// No path between two physical qubits in the coupling map.
    #[error("physical qubits {from} and {to} are not connected in the coupling map")]
    DisconnectedCoupling {
        from: u32,
        to: u32,
    },

    /// The circuit uses more qubits than the target device has.
    #[error("circuit needs {needed} qubits but the coupling map has {available}")]
    CircuitTooWide {
        needed: u32,
        available: u32,
    },

    /// A routing pass ran without a coupling map in the property set.
    #[error("no coupling map configured")]
    MissingCouplingMap,

    /// Coupling map input could not be decoded.
    #[error("invalid coupling map: {0}")]
    InvalidCouplingMap(String),

    /// Error from the IR layer.
    #[error(transparent)]
    Ir(#[from] tangle_ir::IrError),

    /// Error from the QASM frontend.
    #[error(transparent)]
    Qasm(#[from] tangle_qasm::QasmError),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

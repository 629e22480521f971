//! Tangle Circuit Intermediate Representation
//!
//! Core data structures for representing quantum circuits during
//! compilation: wire identifiers, gate and instruction types, symbolic
//! parameter expressions, and the DAG form every pipeline stage consumes
//! and produces.
//!
//! # Overview
//!
//! A circuit is a [`CircuitDag`]: one input/output terminator pair per
//! wire, operation nodes connected by per-wire edges. Appending only
//! extends each wire's total order, so the graph is acyclic by
//! construction, and the topological iteration order is deterministic
//! with ties broken by insertion order. Compilation passes rely on that
//! determinism for reproducible output.
//!
//! # Example
//!
//! ```rust
//! use tangle_ir::{CircuitDag, Instruction, ParameterExpression, QubitId, StandardGate};
//!
//! let mut dag = CircuitDag::new();
//! dag.add_qreg("q", 2);
//! dag.add_creg("c", 2);
//!
//! dag.apply(Instruction::single_qubit_gate(
//!     StandardGate::U2(ParameterExpression::constant(0.0), ParameterExpression::pi()),
//!     QubitId(0),
//! ))
//! .unwrap();
//! dag.apply(Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1)))
//!     .unwrap();
//!
//! assert_eq!(dag.num_ops(), 2);
//! assert_eq!(dag.depth(), 2);
//! ```

pub mod dag;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;

pub use dag::{CircuitDag, CircuitLevel, DagNode, NodeIndex, WireId};
pub use error::{IrError, IrResult};
pub use gate::{ClassicalCondition, Gate, GateKind, NamedGate, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::{MathFn, ParameterExpression};
pub use qubit::{ClbitId, QubitId, Register};

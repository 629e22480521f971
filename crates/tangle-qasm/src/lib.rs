//! `OpenQASM` 2.0 Parser and Emitter for Tangle
//!
//! This crate reads and writes the `OpenQASM` 2.0 quantum assembly
//! language. Parsing produces a syntax tree ([`ast::Program`]) rather
//! than a circuit: gate definitions must survive verbatim so the
//! compiler can expand them against a target basis later. Emission goes
//! the other way, rendering a [`tangle_ir::CircuitDag`] as QASM text
//! with deterministic, bit-stable output.
//!
//! # Supported Features
//!
//! | Feature | Example |
//! |---------|---------|
//! | Version declaration | `OPENQASM 2.0;` |
//! | Includes | `include "qelib1.inc";` |
//! | Register declarations | `qreg q[5];`, `creg c[5];` |
//! | Gate definitions | `gate rzz(theta) a,b { ... }` |
//! | Opaque declarations | `opaque custom(a) q;` |
//! | Builtin gates | `U(0,0,pi) q[0];`, `CX q[0],q[1];` |
//! | Conditioned operations | `if(c==1) x q[0];` |
//! | Measurements | `measure q[0] -> c[0];` |
//! | Reset and barrier | `reset q[0];`, `barrier q;` |
//! | Comments | `// comment` |
//!
//! # Example: Parsing
//!
//! ```rust
//! use tangle_qasm::parse;
//!
//! let program = parse(
//!     r#"
//!     OPENQASM 2.0;
//!     include "qelib1.inc";
//!     qreg q[2];
//!     creg c[2];
//!     h q[0];
//!     cx q[0],q[1];
//!     measure q[0] -> c[0];
//!     measure q[1] -> c[1];
//! "#,
//! )
//! .unwrap();
//! assert_eq!(program.version, "2.0");
//! assert_eq!(program.statements.len(), 7);
//! ```
//!
//! # Example: Emitting
//!
//! ```rust
//! use tangle_ir::{CircuitDag, Instruction, QubitId, StandardGate};
//! use tangle_qasm::emit;
//!
//! let mut dag = CircuitDag::new();
//! dag.add_qreg("q", 2);
//! dag.apply(Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1)))
//!     .unwrap();
//!
//! let qasm = emit(&dag).unwrap();
//! assert!(qasm.starts_with("OPENQASM 2.0;\ninclude \"qelib1.inc\";\n"));
//! assert!(qasm.contains("cx q[0],q[1];"));
//! ```

pub mod ast;
mod emitter;
mod error;
mod lexer;
mod parser;

pub use ast::{Expression, GateCall, GateDef, Program, QubitRef, Statement};
pub use emitter::emit;
pub use error::{QasmError, QasmResult};
pub use lexer::{tokenize, SpannedToken, Token};
pub use parser::{parse, parse_expression};

//! Tangle compilation pipeline.
//!
//! Lowers a parsed QASM 2.0 program onto target hardware in three
//! stages:
//!
//! 1. **Unrolling**: expand gate definitions recursively down to the
//!    `u1`/`u2`/`u3`/`cx` basis ([`Unroller`]).
//! 2. **Routing**: map logical qubits to physical qubits, insert swaps
//!    for non-adjacent two-qubit gates, and fix `cx` direction against
//!    the coupling map ([`passes::SwapMapper`]).
//! 3. **Optimization**: fuse and cancel runs of single-qubit gates
//!    ([`passes::Optimize1qGates`]).
//!
//! Passes implement the [`Pass`] trait and run under a [`PassManager`]
//! that threads a [`PropertySet`] (coupling map, basis gates, layout)
//! through the pipeline.
//!
//! # Example
//!
//! ```rust
//! use tangle_compile::{compile, CouplingMap, PropertySet};
//!
//! let source = r#"
//!     OPENQASM 2.0;
//!     include "qelib1.inc";
//!     qreg q[3];
//!     creg c[3];
//!     h q[0];
//!     cx q[0], q[2];
//!     measure q -> c;
//! "#;
//! let program = tangle_qasm::parse(source).unwrap();
//!
//! let coupling = CouplingMap::linear(3);
//! let props = PropertySet::new().with_coupling_map(coupling);
//! let dag = compile(&program, props).unwrap();
//!
//! let qasm = tangle_qasm::emit(&dag).unwrap();
//! assert!(qasm.starts_with("OPENQASM 2.0;"));
//! ```

pub mod coupling;
pub mod error;
pub mod manager;
pub mod output;
pub mod pass;
pub mod unitary;
pub mod unroller;

// Built-in passes
pub mod passes;

pub use coupling::{BasisGates, CouplingMap, Layout, PropertySet};
pub use error::{CompileError, CompileResult};
pub use manager::PassManager;
pub use output::{CompiledInstruction, CompiledParam, CompiledProgram, CompiledRegister};
pub use pass::Pass;
pub use unroller::Unroller;

use tangle_ir::CircuitDag;
use tangle_qasm::Program;

/// Unroll a program to the basis and run the standard pipeline.
pub fn compile(program: &Program, mut properties: PropertySet) -> CompileResult<CircuitDag> {
    let unroller = Unroller::new(properties.basis_gates.clone())?;
    let mut dag = unroller.unroll(program)?;
    PassManager::standard().run(&mut dag, &mut properties)?;
    Ok(dag)
}

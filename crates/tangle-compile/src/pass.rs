//! Pass trait for circuit transformations.

use tangle_ir::CircuitDag;

use crate::coupling::PropertySet;
use crate::error::CompileResult;

/// A compilation pass over a circuit DAG.
///
/// Passes may rewrite the DAG in place or replace it wholesale, and
/// communicate through the shared [`PropertySet`].
pub trait Pass: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Run the pass.
    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()>;

    /// Whether the pass applies given the current state. Passes whose
    /// preconditions are not met are skipped, not errored.
    fn should_run(&self, _dag: &CircuitDag, _properties: &PropertySet) -> bool {
        true
    }
}

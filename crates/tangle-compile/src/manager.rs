//! Pass manager orchestrating the compilation pipeline.

use tracing::{debug, info, instrument};

use tangle_ir::CircuitDag;

use crate::coupling::PropertySet;
use crate::error::CompileResult;
use crate::pass::Pass;
use crate::passes::{Optimize1qGates, SwapMapper};

/// Executes a sequence of passes in order.
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// The default pipeline: routing (when a coupling map is present)
    /// followed by single-qubit fusion.
    pub fn standard() -> Self {
        let mut pm = Self::new();
        pm.add_pass(SwapMapper);
        pm.add_pass(Optimize1qGates);
        pm
    }

    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the DAG.
    #[instrument(skip(self, dag, properties))]
    pub fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            passes = self.passes.len(),
            qubits = dag.num_qubits(),
            "running pass manager"
        );

        for pass in &self.passes {
            if pass.should_run(dag, properties) {
                debug!(pass = pass.name(), "running pass");
                pass.run(dag, properties)?;
                debug!(pass = pass.name(), ops = dag.num_ops(), "pass completed");
            } else {
                debug!(pass = pass.name(), "skipping pass");
            }
        }

        info!(depth = dag.depth(), ops = dag.num_ops(), "pipeline completed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

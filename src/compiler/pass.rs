//! The phase trait implemented by every graph transformation.

use crate::{compiler::EventLog, ir::Graph, Result};

/// A transformation that runs over one graph.
///
/// A phase instance belongs to one compilation: it may keep state across the
/// candidates it visits in a graph (for example the loops it already
/// transformed) but is never shared between graphs. The
/// [`crate::compiler::PassScheduler`] creates a fresh instance per graph
/// from a factory, which is why phases only need to be `Send`.
///
/// # Errors and rejections
///
/// A phase that decides not to transform something simply reports `false`.
/// Returning an error abandons the compilation of the graph; the graph may
/// have been partially rewritten and must be discarded.
pub trait Phase: Send {
    /// Unique name for events and debugging.
    fn name(&self) -> &'static str;

    /// Run the phase on a graph.
    ///
    /// Returns `true` if the graph changed, `false` otherwise.
    /// Events should be recorded directly to `events`.
    ///
    /// # Arguments
    ///
    /// * `graph` - The graph to transform.
    /// * `events` - The shared event log.
    ///
    /// # Errors
    ///
    /// Returns an error if an internal invariant was violated.
    fn run(&mut self, graph: &mut Graph, events: &EventLog) -> Result<bool>;

    /// Get a description of what this phase does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}

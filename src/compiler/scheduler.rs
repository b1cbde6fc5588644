//! Pass scheduler for running phases over batches of graphs.
//!
//! The `PassScheduler` runs an ordered list of phases over every graph of a
//! batch. Graphs are independent compilation units, so they are processed in
//! parallel with rayon; a phase instance is created per graph and never
//! shared.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

use rayon::prelude::*;

use crate::{
    compiler::{DerivedStats, EventKind, EventLog, Phase},
    ir::{validate, Graph},
    Result,
};

type PhaseFactory = Box<dyn Fn() -> Box<dyn Phase> + Send + Sync>;

/// Orchestrates phase execution over graphs.
///
/// Each graph runs the phases in registration order. A phase error abandons
/// that graph only: it is recorded as an [`EventKind::Error`] event and
/// reported in the graph's result slot, while the rest of the batch proceeds.
pub struct PassScheduler {
    /// Phase factories, in execution order.
    phases: Vec<PhaseFactory>,
    /// Validate the graph after every phase that changed it.
    validate: bool,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(cfg!(debug_assertions))
    }
}

impl PassScheduler {
    /// Creates an empty scheduler.
    ///
    /// # Arguments
    ///
    /// * `validate` - Whether to run [`validate`] after every phase that
    ///   changed the graph.
    ///
    /// # Returns
    ///
    /// A new `PassScheduler` without phases.
    #[must_use]
    pub fn new(validate: bool) -> Self {
        Self {
            phases: Vec::new(),
            validate,
        }
    }

    /// Appends a phase, created afresh for every graph by `factory`.
    ///
    /// # Returns
    ///
    /// The modified scheduler (builder pattern).
    #[must_use]
    pub fn with_phase<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Phase> + Send + Sync + 'static,
    {
        self.phases.push(Box::new(factory));
        self
    }

    /// Returns the number of registered phases.
    #[must_use]
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Runs every phase over one graph.
    ///
    /// # Arguments
    ///
    /// * `graph` - The graph to transform.
    /// * `events` - The event log receiving phase and transformation events.
    ///
    /// # Returns
    ///
    /// `true` if any phase changed the graph.
    ///
    /// # Errors
    ///
    /// Returns the first phase or validation error; later phases do not run.
    pub fn run_one(&self, graph: &mut Graph, events: &EventLog) -> Result<bool> {
        let mut changed = false;
        for factory in &self.phases {
            let mut phase = factory();
            events
                .record(EventKind::PassStarted)
                .function(graph.function())
                .pass(phase.name());

            let phase_changed = phase.run(graph, events)?;
            if phase_changed && self.validate {
                validate(graph)?;
            }
            changed |= phase_changed;

            events
                .record(EventKind::PassCompleted)
                .function(graph.function())
                .pass(phase.name())
                .message(if phase_changed { "changed" } else { "unchanged" });
        }
        Ok(changed)
    }

    /// Runs every phase over a batch of graphs in parallel.
    ///
    /// # Arguments
    ///
    /// * `graphs` - The graphs to transform.
    /// * `events` - The shared event log.
    ///
    /// # Returns
    ///
    /// One result per graph, in input order: whether the graph changed, or
    /// the error that abandoned it.
    pub fn run(&self, graphs: &mut [Graph], events: &EventLog) -> Vec<Result<bool>> {
        let failures = AtomicUsize::new(0);
        let results: Vec<Result<bool>> = graphs
            .par_iter_mut()
            .map(|graph| {
                let result = self.run_one(graph, events);
                if let Err(error) = &result {
                    failures.fetch_add(1, Ordering::Relaxed);
                    events
                        .record(EventKind::Error)
                        .function(graph.function())
                        .message(format!("compilation of {} abandoned: {error}", graph.name()));
                }
                result
            })
            .collect();

        let failures = failures.load(Ordering::Relaxed);
        if failures > 0 {
            events.warn(format!("{failures} of {} graphs failed", graphs.len()));
        }
        results
    }

    /// Runs a batch like [`PassScheduler::run`] and summarizes it.
    ///
    /// # Arguments
    ///
    /// * `graphs` - The graphs to transform.
    /// * `events` - The shared event log.
    ///
    /// # Returns
    ///
    /// The per-graph results together with statistics derived from `events`
    /// and the wall-clock time of the batch. Events already in the log count
    /// towards the statistics.
    pub fn run_with_stats(
        &self,
        graphs: &mut [Graph],
        events: &EventLog,
    ) -> (Vec<Result<bool>>, DerivedStats) {
        let start = Instant::now();
        let results = self.run(graphs, events);
        let stats = DerivedStats::from_log(events).with_time(start.elapsed());
        (results, stats)
    }
}

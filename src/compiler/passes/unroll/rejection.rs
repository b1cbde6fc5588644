//! Reasons a candidate loop is left alone.

use std::fmt;

use crate::{ir::NodeKind, utils::graph::BlockIndex};

/// Why a loop was not unrolled.
///
/// Rejections are ordinary outcomes of the analysis, not errors: the phase
/// reports them (when verbose) and moves on to the next candidate. A rejected
/// loop is not retried in the same compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The graph's function is not on the configured allow-list.
    FunctionNotAllowed,
    /// The header does not have exactly one predecessor outside the loop.
    NoPreHeader {
        /// Number of entering predecessors found.
        found: usize,
    },
    /// The header does not have exactly one back-edge predecessor.
    NoUniqueTail {
        /// Number of back-edge predecessors found.
        found: usize,
    },
    /// Some block other than the tail leaves the loop.
    MultipleExits {
        /// The offending exiting block.
        block: BlockIndex,
    },
    /// The tail does not end in a two-way branch with exactly one edge
    /// leaving the loop.
    TailNotBranch,
    /// The branch condition is not a recognised induction-variable test.
    NoInductionVariable,
    /// The induction variable is not stored exactly once before the loop.
    AmbiguousInitialValue {
        /// Stores found in the pre-header.
        stores: usize,
    },
    /// The induction variable is not stored exactly once in the loop, or the
    /// store is not the update the condition tests.
    AmbiguousUpdate {
        /// Stores found in the loop body.
        stores: usize,
    },
    /// Simulating the loop overflowed 32-bit arithmetic.
    IterationOverflow,
    /// The simulated trip count exceeds the configured ceiling.
    TooManyIterations {
        /// The configured ceiling.
        limit: u32,
    },
    /// A body block was not reachable from the entry.
    UnreachableBlock {
        /// The unreachable block.
        block: BlockIndex,
    },
    /// The body contains a kind that must not be duplicated.
    Denylisted {
        /// The offending kind.
        kind: NodeKind,
    },
    /// The body contains a node that cannot be cloned.
    Uncloneable {
        /// The kind of the offending node.
        kind: NodeKind,
    },
    /// The body is larger than the applicable limit.
    BodyTooLarge {
        /// Material nodes counted (possibly stopped early).
        size: usize,
        /// The limit that was exceeded.
        limit: usize,
    },
    /// The body stores to arrays without loading from them.
    StoreDominated,
    /// The trip count is unknown and partial unrolling is not allowed.
    PartialUnrollDisabled,
}

impl Rejection {
    /// A short stable name for the failed check.
    #[must_use]
    pub fn check(&self) -> &'static str {
        match self {
            Rejection::FunctionNotAllowed => "allow-list",
            Rejection::NoPreHeader { .. } => "pre-header",
            Rejection::NoUniqueTail { .. }
            | Rejection::MultipleExits { .. }
            | Rejection::TailNotBranch => "tail",
            Rejection::NoInductionVariable
            | Rejection::AmbiguousInitialValue { .. }
            | Rejection::AmbiguousUpdate { .. }
            | Rejection::IterationOverflow
            | Rejection::TooManyIterations { .. } => "induction",
            Rejection::UnreachableBlock { .. }
            | Rejection::Denylisted { .. }
            | Rejection::Uncloneable { .. } => "body",
            Rejection::BodyTooLarge { .. }
            | Rejection::StoreDominated
            | Rejection::PartialUnrollDisabled => "profitability",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::FunctionNotAllowed => write!(f, "function is not on the allow-list"),
            Rejection::NoPreHeader { found } => {
                write!(f, "expected one pre-header, found {found}")
            }
            Rejection::NoUniqueTail { found } => {
                write!(f, "expected one back edge, found {found}")
            }
            Rejection::MultipleExits { block } => {
                write!(f, "block {block} exits the loop before the tail")
            }
            Rejection::TailNotBranch => write!(f, "tail is not a loop-exiting branch"),
            Rejection::NoInductionVariable => write!(f, "no induction variable"),
            Rejection::AmbiguousInitialValue { stores } => {
                write!(f, "{stores} stores to the induction variable before the loop")
            }
            Rejection::AmbiguousUpdate { stores } => {
                write!(f, "{stores} stores to the induction variable in the loop")
            }
            Rejection::IterationOverflow => write!(f, "induction variable overflows"),
            Rejection::TooManyIterations { limit } => {
                write!(f, "more than {limit} iterations")
            }
            Rejection::UnreachableBlock { block } => write!(f, "body block {block} is unreachable"),
            Rejection::Denylisted { kind } => write!(f, "body contains {kind}"),
            Rejection::Uncloneable { kind } => write!(f, "body contains uncloneable {kind}"),
            Rejection::BodyTooLarge { size, limit } => {
                write!(f, "body size {size} exceeds {limit}")
            }
            Rejection::StoreDominated => write!(f, "body only stores to arrays"),
            Rejection::PartialUnrollDisabled => {
                write!(f, "trip count unknown and partial unrolling disabled")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Rejection::BodyTooLarge {
                size: 130,
                limit: 120
            }
            .to_string(),
            "body size 130 exceeds 120"
        );
        assert_eq!(
            Rejection::Denylisted {
                kind: NodeKind::StrCat
            }
            .to_string(),
            "body contains StrCat"
        );
        assert_eq!(
            Rejection::MultipleExits {
                block: BlockIndex::new(3)
            }
            .to_string(),
            "block #3 exits the loop before the tail"
        );
    }

    #[test]
    fn test_check_names() {
        assert_eq!(Rejection::NoUniqueTail { found: 2 }.check(), "tail");
        assert_eq!(Rejection::TooManyIterations { limit: 16 }.check(), "induction");
        assert_eq!(Rejection::Denylisted { kind: NodeKind::MakeRope }.check(), "body");
        assert_eq!(Rejection::StoreDominated.check(), "profitability");
    }
}

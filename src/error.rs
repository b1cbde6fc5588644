use thiserror::Error;

/// Creates an [`Error::InvariantViolation`] carrying the caller's source location.
///
/// Used wherever the optimizer reaches a state its own earlier checks should
/// have ruled out, such as cloning a node that the cloneability scan never
/// approved.
///
/// ```rust,ignore
/// return Err(invariant_violation!("block {} was never cloned", block));
/// ```
macro_rules! invariant_violation {
    // Single string version
    ($msg:expr) => {
        crate::Error::InvariantViolation {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvariantViolation {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Creates an [`Error::GraphError`] describing malformed graph input.
///
/// ```rust,ignore
/// return Err(graph_error!("node {} has no terminal", node));
/// ```
macro_rules! graph_error {
    ($msg:expr) => {
        crate::Error::GraphError($msg.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::GraphError(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Expected outcomes of the optimizer, such as a loop that does not have a
/// supported shape, are *not* errors; they are reported as
/// [`crate::compiler::Rejection`] values and the optimizer moves on. An `Error`
/// always aborts the compilation of the affected function.
///
/// # Error Categories
///
/// - [`Error::InvariantViolation`] - Internal consistency check failed during a transformation
/// - [`Error::GraphError`] - Malformed graph handed to the builder, validator or interpreter
/// - [`Error::Config`] - Invalid configuration or allow-list content
/// - [`Error::FileError`] - Filesystem I/O errors while loading configuration
///
/// # Examples
///
/// ```rust,ignore
/// use dfg_unroll::{Error, compiler::{LoopUnrollingPhase, Phase, UnrollConfig}};
///
/// let mut phase = LoopUnrollingPhase::new(UnrollConfig::default());
/// match phase.run(&mut graph, &events) {
///     Ok(changed) => println!("changed: {changed}"),
///     Err(Error::InvariantViolation { message, file, line }) => {
///         eprintln!("internal error: {message} ({file}:{line})");
///     }
///     Err(e) => eprintln!("error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An internal invariant of a transformation was violated.
    ///
    /// This error indicates a bug in the optimizer rather than a property of
    /// the input program: the pre-checks claimed an operation was safe, but
    /// carrying it out found otherwise. The compilation of the affected
    /// function must be abandoned because the graph may be partially rewritten.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of the violated invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Invariant violation - {file}:{line}: {message}")]
    InvariantViolation {
        /// The message to be printed for the InvariantViolation error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Invalid configuration.
    ///
    /// Raised while parsing allow-lists or validating option values.
    #[error("Invalid configuration - {0}")]
    Config(String),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while reading configuration
    /// files such as function allow-lists.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The graph is malformed.
    ///
    /// Errors reported by [`crate::ir::GraphBuilder`], [`crate::ir::validate`]
    /// and [`crate::ir::Interpreter`] when the graph does not satisfy the
    /// structural rules of the IR, for example a block without a terminal or a
    /// child reference to a node that does not exist.
    #[error("{0}")]
    GraphError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_violation_captures_location() {
        let err = invariant_violation!("node {} missing", 7);
        match err {
            Error::InvariantViolation {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "node 7 missing");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            graph_error!("block {} has no terminal", "#3").to_string(),
            "block #3 has no terminal"
        );
        assert_eq!(
            Error::Config("bad".into()).to_string(),
            "Invalid configuration - bad"
        );
    }
}

//! Configuration for the loop-unrolling phase.
//!
//! This module provides [`UnrollConfig`], which bounds how much code the
//! unroller may duplicate, and [`FunctionAllowList`], which restricts the
//! phase to a chosen set of functions.

use std::{collections::HashSet, fs, path::Path, str::FromStr};

use crate::{utils::FunctionHash, Error, Result};

/// Configuration for [`crate::compiler::LoopUnrollingPhase`].
///
/// Body sizes count *material* nodes: nodes that survive to machine code.
/// Phis, hints and argument-less bookkeeping nodes are not counted.
#[derive(Debug, Clone)]
pub struct UnrollConfig {
    /// Maximum number of loops unrolled per compilation (default: 2).
    pub max_unrolled_loops: usize,

    /// Maximum body size of a fully unrolled loop (default: 120).
    pub max_full_unroll_body_size: usize,

    /// Maximum body size of a partially unrolled loop (default: 60).
    pub max_partial_unroll_body_size: usize,

    /// Unroll loops whose trip count is unknown (default: true).
    pub enable_partial_unroll: bool,

    /// Total number of body copies after a partial unroll, original
    /// included (default: 2).
    pub partial_unroll_copies: usize,

    /// Maximum trip count of a fully unrolled loop (default: 16).
    pub max_iteration_count: u32,

    /// Upper size bound of a single-block numeric hot loop (default: 320).
    ///
    /// Such loops are accepted above the regular size limits because the
    /// unrolled copies expose arithmetic to later scheduling.
    pub max_numeric_loop_size: usize,

    /// Only consider loops that contain no other loop (default: false).
    pub innermost_only: bool,

    /// Never partially unroll, even when enabled (default: false).
    pub require_full_unroll: bool,

    /// Record an event for every rejected loop (default: false).
    pub verbose: bool,

    /// Record graph dumps before and after the phase (default: false).
    pub dump_graph: bool,

    /// Functions eligible for unrolling; `None` allows every function.
    pub allow_list: Option<FunctionAllowList>,
}

impl Default for UnrollConfig {
    fn default() -> Self {
        Self {
            max_unrolled_loops: 2,
            max_full_unroll_body_size: 120,
            max_partial_unroll_body_size: 60,
            enable_partial_unroll: true,
            partial_unroll_copies: 2,
            max_iteration_count: 16,
            max_numeric_loop_size: 320,
            innermost_only: false,
            require_full_unroll: false,
            verbose: false,
            dump_graph: false,
            allow_list: None,
        }
    }
}

impl UnrollConfig {
    /// Creates a new configuration with default settings.
    ///
    /// # Returns
    ///
    /// A new `UnrollConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a "conservative" configuration that only fully unrolls small,
    /// innermost loops.
    ///
    /// This configuration uses:
    /// - One unrolled loop per compilation
    /// - Half the default full-unroll size limit
    /// - At most 8 iterations
    /// - No partial unrolling
    ///
    /// # Returns
    ///
    /// A new `UnrollConfig` optimized for code size.
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            max_unrolled_loops: 1,
            max_full_unroll_body_size: 60,
            max_iteration_count: 8,
            enable_partial_unroll: false,
            innermost_only: true,
            require_full_unroll: true,
            ..Self::default()
        }
    }

    /// Creates an "aggressive" configuration for maximum unrolling.
    ///
    /// This configuration uses:
    /// - Up to 8 unrolled loops per compilation
    /// - Doubled size limits
    /// - Up to 64 iterations when fully unrolling
    /// - Four copies when partially unrolling
    ///
    /// # Returns
    ///
    /// A new `UnrollConfig` optimized for throughput over code size.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            max_unrolled_loops: 8,
            max_full_unroll_body_size: 240,
            max_partial_unroll_body_size: 120,
            partial_unroll_copies: 4,
            max_iteration_count: 64,
            max_numeric_loop_size: 640,
            ..Self::default()
        }
    }

    /// Sets the per-compilation unroll budget.
    ///
    /// # Arguments
    ///
    /// * `max` - The maximum number of loops unrolled per graph.
    ///
    /// # Returns
    ///
    /// The modified configuration (builder pattern).
    #[must_use]
    pub fn with_max_unrolled_loops(mut self, max: usize) -> Self {
        self.max_unrolled_loops = max;
        self
    }

    /// Sets the body size limits.
    ///
    /// # Arguments
    ///
    /// * `full` - Maximum material body size for a full unroll.
    /// * `partial` - Maximum material body size for a partial unroll.
    ///
    /// # Returns
    ///
    /// The modified configuration (builder pattern).
    #[must_use]
    pub fn with_body_size_limits(mut self, full: usize, partial: usize) -> Self {
        self.max_full_unroll_body_size = full;
        self.max_partial_unroll_body_size = partial;
        self
    }

    /// Enables or disables partial unrolling.
    ///
    /// # Arguments
    ///
    /// * `enable` - Whether loops with unknown trip counts may be unrolled.
    /// * `copies` - Total number of body copies after unrolling.
    ///
    /// # Returns
    ///
    /// The modified configuration (builder pattern).
    #[must_use]
    pub fn with_partial_unroll(mut self, enable: bool, copies: usize) -> Self {
        self.enable_partial_unroll = enable;
        self.partial_unroll_copies = copies;
        self
    }

    /// Sets the maximum trip count of a fully unrolled loop.
    #[must_use]
    pub fn with_max_iteration_count(mut self, max: u32) -> Self {
        self.max_iteration_count = max;
        self
    }

    /// Sets the size bound of the numeric hot-loop rule.
    #[must_use]
    pub fn with_max_numeric_loop_size(mut self, max: usize) -> Self {
        self.max_numeric_loop_size = max;
        self
    }

    /// Restricts unrolling to innermost loops.
    #[must_use]
    pub fn with_innermost_only(mut self, innermost_only: bool) -> Self {
        self.innermost_only = innermost_only;
        self
    }

    /// Forbids partial unrolling.
    #[must_use]
    pub fn with_require_full_unroll(mut self, require_full_unroll: bool) -> Self {
        self.require_full_unroll = require_full_unroll;
        self
    }

    /// Enables rejection events and graph dumps.
    ///
    /// # Arguments
    ///
    /// * `verbose` - Record an event for every rejected loop.
    /// * `dump_graph` - Record graph dumps before and after the phase.
    ///
    /// # Returns
    ///
    /// The modified configuration (builder pattern).
    #[must_use]
    pub fn with_diagnostics(mut self, verbose: bool, dump_graph: bool) -> Self {
        self.verbose = verbose;
        self.dump_graph = dump_graph;
        self
    }

    /// Restricts unrolling to the functions in `allow_list`.
    #[must_use]
    pub fn with_allow_list(mut self, allow_list: FunctionAllowList) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    /// Returns true if a function with the given identity may be unrolled.
    ///
    /// Without an allow-list every function is eligible. With one, a function
    /// without identity never is.
    #[must_use]
    pub fn is_function_allowed(&self, function: Option<FunctionHash>) -> bool {
        match (&self.allow_list, function) {
            (None, _) => true,
            (Some(list), Some(function)) => list.contains(function),
            (Some(_), None) => false,
        }
    }

    /// Returns the size limit applying to a full or partial unroll.
    #[must_use]
    pub fn body_size_limit(&self, full: bool) -> usize {
        if full {
            self.max_full_unroll_body_size
        } else {
            self.max_partial_unroll_body_size
        }
    }
}

/// A set of functions eligible for unrolling.
///
/// The text format holds one [`FunctionHash`] per line as eight hex digits.
/// Blank lines and lines starting with `#` are ignored.
///
/// ```text
/// # hot kernels
/// a9993e36
/// 0badc0de
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionAllowList {
    functions: HashSet<FunctionHash>,
}

impl FunctionAllowList {
    /// Creates an empty allow-list, which admits no function.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads an allow-list from a file.
    ///
    /// # Arguments
    ///
    /// * `path` - The file to read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] if the file cannot be read and
    /// [`Error::Config`] if a line is not a valid function identity.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        fs::read_to_string(path)?.parse()
    }

    /// Adds a function.
    pub fn insert(&mut self, function: FunctionHash) -> bool {
        self.functions.insert(function)
    }

    /// Returns true if `function` is listed.
    #[must_use]
    pub fn contains(&self, function: FunctionHash) -> bool {
        self.functions.contains(&function)
    }

    /// Returns the number of listed functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if no function is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FromStr for FunctionAllowList {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut list = Self::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let function = line.parse::<FunctionHash>().map_err(|_| {
                Error::Config(format!(
                    "allow-list line {}: '{}' is not a function id",
                    number + 1,
                    line
                ))
            })?;
            list.insert(function);
        }
        Ok(list)
    }
}

impl FromIterator<FunctionHash> for FunctionAllowList {
    fn from_iter<T: IntoIterator<Item = FunctionHash>>(iter: T) -> Self {
        Self {
            functions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = UnrollConfig::default();
        assert_eq!(config.max_unrolled_loops, 2);
        assert_eq!(config.max_full_unroll_body_size, 120);
        assert_eq!(config.max_partial_unroll_body_size, 60);
        assert!(config.enable_partial_unroll);
        assert_eq!(config.partial_unroll_copies, 2);
        assert_eq!(config.max_iteration_count, 16);
        assert_eq!(config.max_numeric_loop_size, 320);
        assert!(!config.innermost_only);
        assert!(!config.require_full_unroll);
        assert!(config.allow_list.is_none());
    }

    #[test]
    fn test_presets() {
        let conservative = UnrollConfig::conservative();
        assert!(conservative.innermost_only);
        assert!(!conservative.enable_partial_unroll);

        let aggressive = UnrollConfig::aggressive();
        assert_eq!(aggressive.partial_unroll_copies, 4);
        assert!(aggressive.max_full_unroll_body_size > UnrollConfig::default().max_full_unroll_body_size);
    }

    #[test]
    fn test_builder_pattern() {
        let config = UnrollConfig::new()
            .with_max_unrolled_loops(5)
            .with_body_size_limits(10, 5)
            .with_partial_unroll(true, 3)
            .with_diagnostics(true, false);

        assert_eq!(config.max_unrolled_loops, 5);
        assert_eq!(config.body_size_limit(true), 10);
        assert_eq!(config.body_size_limit(false), 5);
        assert_eq!(config.partial_unroll_copies, 3);
        assert!(config.verbose);
    }

    #[test]
    fn test_allow_list_parsing() {
        let list: FunctionAllowList = "# comment\n\na9993e36\n  0BADC0DE  \n".parse().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(FunctionHash::from_source("abc")));
        assert!(list.contains(FunctionHash::from_raw(0x0bad_c0de)));

        let err = "a9993e36\nnot-hex\n".parse::<FunctionAllowList>().unwrap_err();
        match err {
            Error::Config(message) => assert!(message.contains("line 2")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_allow_list_from_file() {
        let path = std::env::temp_dir().join(format!("dfg-unroll-allow-{}.txt", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# kernels").unwrap();
        writeln!(file, "a9993e36").unwrap();
        drop(file);

        let list = FunctionAllowList::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(list.len(), 1);

        assert!(matches!(
            FunctionAllowList::from_file(&path),
            Err(Error::FileError(_))
        ));
    }

    #[test]
    fn test_function_eligibility() {
        let abc = FunctionHash::from_source("abc");
        let config = UnrollConfig::default();
        assert!(config.is_function_allowed(None));

        let config = config.with_allow_list([abc].into_iter().collect());
        assert!(config.is_function_allowed(Some(abc)));
        assert!(!config.is_function_allowed(Some(FunctionHash::from_raw(1))));
        assert!(!config.is_function_allowed(None));
    }
}

//! Graph algorithms for control flow analysis.
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | DFS | O(V + E) | Reachability, dead block pruning |
//! | Reverse post-order | O(V + E) | Deterministic loop discovery |
//! | Dominators | O(E α(V)) | Loop detection, pre-header/tail location |

mod dominators;
mod traversal;

pub use dominators::{compute_dominators, compute_dominators_rooted, DominatorTree};
pub use traversal::{dfs, postorder, reverse_postorder, DfsIterator};

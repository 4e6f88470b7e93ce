//! # EMPI Graph (`graph`)
//!
//! Connected-component expansion ([`recurse`]) and rewrite
//! ([`run_graph_cursor`]) for the identity-resolution match graph.
//!
//! The recursor expands a seed record_id into its connected component
//! by following `EnterpriseMatch` edges; the cursor takes the touched
//! edges of one component and rewrites the `EnterpriseMatch` /
//! `EnterpriseGroup` / `Bulletin` tables to match.

mod cursor;
mod error;
mod recursor;

pub use cursor::{run_graph_cursor, GraphCursorOutcome};
pub use error::GraphError;
pub use recursor::{recurse, RecursionResult};

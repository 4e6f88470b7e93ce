//! # EMPI Match Engine (`match-engine`)
//!
//! Coarse candidate selection and fine-scored demographic matching.
//!
//! - [`coarse_matching`]: given a new demographic, every other record
//!   sharing its postal code, name-day, or family name.
//! - [`toy_fine_matching`] / [`prod_fine_matching`]: pluggable fine
//!   scorers selected by [`MatchConfig::mode`].
//! - [`compute_all_matches`]: fine-match results for every coarse
//!   candidate of a seed record, plus total elapsed time.
//!
//! ## Example
//!
//! ```
//! use match_engine::{compute_all_matches, MatchConfig};
//! use store::Store;
//!
//! let store = Store::in_memory();
//! // ... populate `store` with Demographic rows ...
//! let cfg = MatchConfig::default();
//! ```

mod engine;
mod types;

pub use engine::{coarse_matching, compute_all_matches, prod_fine_matching, toy_fine_matching};
pub use types::{FineMatchResult, MatchConfig, MatchError, MatchMode};

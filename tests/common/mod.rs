//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{venue_payload, TestEnv, VENUE_ID};
//! use setlist_curator::EntityKind;
//!
//! #[test]
//! fn test_venue() {
//!     let env = TestEnv::new();
//!     env.push(EntityKind::Venue, venue_payload(VENUE_ID, "Red Rocks"));
//!     let report = env.run_pass();
//!     assert_eq!(report.total_succeeded, 1);
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::*;

//! # Splitest: Embedded A/B Testing Engine
//!
//! Splitest assigns website visitors to content variants ("arms") of named
//! experiments, tracks exposure and conversion counts per arm, and computes
//! statistical significance between arms from fixed lookup tables.
//!
//! ## Design
//!
//! - **Deterministic assignment**: `visitor_key mod arm_count` - no state
//!   needed to show a returning visitor the same arm.
//! - **At-most-once scoring**: each visitor counts once toward
//!   participation and once toward conversion per experiment; bots are
//!   served but never scored.
//! - **Coarse-locked persisted registry**: one mutex serializes every
//!   read-modify-write on the shared experiment map; the store loads
//!   lazily, fails open on corruption, and swallows save failures.
//! - **Bucketed significance**: a two-proportion z-test for two arms, a
//!   chi-square test for more, both reverse-looked-up in fixed
//!   critical-value tables.
//!
//! The host application keeps three concerns for itself: rendering the
//! chosen arm's content, carrying the visitor token across requests, and
//! deciding where the registry file lives.
//!
//! ## Example
//!
//! ```rust
//! use splitest::{MemoryStore, SplitTester, VisitorIdentity};
//!
//! let tester = SplitTester::new(MemoryStore::new());
//! let experiment = tester.get_or_create_experiment(
//!     "signup-button",
//!     &["green button", "red button"],
//! )?;
//!
//! // decoded from the request's token in a real handler
//! let mut visitor = VisitorIdentity::new();
//! let agent = Some("Mozilla/5.0");
//!
//! let arm = tester.pick_alternative(&experiment, &mut visitor, agent)?;
//! println!("render: {}", arm.content());
//!
//! // later, on the goal page:
//! tester.score_conversion("signup-button", &mut visitor);
//! if visitor.is_dirty() {
//!     let _token = visitor.encode(); // write back to the carrier
//! }
//! # Ok::<(), splitest::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod identity;
pub mod model;
pub mod registry;
pub mod stats;
pub mod tester;

pub use error::{Error, Result};
pub use identity::VisitorIdentity;
pub use model::{Alternative, Experiment, TestStatus, MIN_OBSERVATIONS};
pub use registry::{ExperimentRegistry, JsonFileStore, MemoryStore, RegistryStore, SavePolicy};
pub use stats::{
    MultiArmChiSquareTest, SignificanceTest, TwoArmZTest, DEFAULT_SIGNIFICANCE_LEVEL,
};
pub use tester::{is_bot_request, SplitTester, BOT_SIGNATURES};

//! Epconf Testing Infrastructure
//!
//! Common schemas, value builders, proptest strategies and receivers shared by the
//! integration tests of the epconf crates.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! epconf-testkit = { workspace = true }
//! ```
//!
//! ```rust
//! use epconf_testkit::*;
//! use epconf_tree::ConfigTree;
//!
//! let tree = ConfigTree::new(config_schema()).unwrap();
//! assert_consistent!(tree);
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod assertions;
pub mod fixtures;
pub mod receivers;
pub mod strategies;

pub use assertions::*;
pub use fixtures::*;
pub use receivers::*;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

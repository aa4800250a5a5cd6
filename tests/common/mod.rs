#![allow(dead_code)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;

pub use strandloom::test_utils::{
    init_test_logging, repeating, scripted, shared_trace, test_real, test_virtual,
    test_virtual_until, visit_order, SharedTrace, Visit, DEFAULT_TEST_SEED,
};

/// Fixed seed so property tests replay identically in CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

/// Build a ProptestConfig with a deterministic seed.
#[must_use]
pub fn proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    config.rng_seed = RngSeed::Fixed(DEFAULT_PROPTEST_SEED);
    config.max_shrink_iters = 64;
    config
}

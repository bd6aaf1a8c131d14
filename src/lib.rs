//! HSS/LMS stateful hash-based signatures.
//!
//! Thin facade over the `hsslms-lib` engine and the `hss-types` report
//! structures, so applications depend on a single crate.

pub use hss_types;
pub use hsslms_lib::{benchmark, lms};

pub use hsslms_lib::{
    BenchmarkMetrics, BenchmarkReport, HssConfig, HssPrivateKey, HssPublicKey, HssSignature,
    HssSigner, LmsError,
};
pub use hsslms_lib::lms::{
    FileStore, LmotsAlgorithm, LmsAlgorithm, MemoryStore, Result, StateStore,
};

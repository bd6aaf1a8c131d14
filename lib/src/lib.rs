pub mod benchmark;
pub mod lms;

// Re-export main types
pub use benchmark::{BenchmarkMetrics, BenchmarkReport};
pub use lms::{HssConfig, HssPrivateKey, HssPublicKey, HssSignature, HssSigner, LmsError};

// Timing harness for key generation, signing and verification

pub mod metrics;
pub mod report;

pub use metrics::BenchmarkMetrics;
pub use report::BenchmarkReport;

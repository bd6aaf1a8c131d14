use std::error::Error;
use std::fs;
use std::path::Path;

use super::metrics::BenchmarkMetrics;

/// Collects benchmark runs and renders them
#[derive(Debug, Default)]
pub struct BenchmarkReport {
    metrics: Vec<BenchmarkMetrics>,
}

impl BenchmarkReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_metrics(&mut self, metrics: BenchmarkMetrics) {
        self.metrics.push(metrics);
    }

    pub fn metrics(&self) -> &[BenchmarkMetrics] {
        &self.metrics
    }

    /// Save report as JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(&self.metrics)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Averages per signature across every run
    pub fn summary(&self) -> String {
        let total_signatures: usize = self.metrics.iter().map(|m| m.signature_count).sum();
        if self.metrics.is_empty() || total_signatures == 0 {
            return "No metrics available".to_string();
        }

        let total_runs = self.metrics.len();
        let avg_keygen = self
            .metrics
            .iter()
            .map(|m| m.keygen_time.as_secs_f64())
            .sum::<f64>()
            / total_runs as f64;
        let per_sign = self
            .metrics
            .iter()
            .map(|m| m.signing_time.as_secs_f64())
            .sum::<f64>()
            / total_signatures as f64;
        let per_verify = self
            .metrics
            .iter()
            .map(|m| m.verification_time.as_secs_f64())
            .sum::<f64>()
            / total_signatures as f64;
        let all_valid = self.metrics.iter().all(|m| m.all_valid);

        format!(
            "Benchmark Summary:\n\
             Total runs: {}\n\
             Total signatures: {}\n\
             Average key generation time: {:.3}s\n\
             Average signing time: {:.3}ms\n\
             Average verification time: {:.3}ms\n\
             All signatures valid: {}",
            total_runs,
            total_signatures,
            avg_keygen,
            per_sign * 1000.0,
            per_verify * 1000.0,
            all_valid
        )
    }
}

use std::time::{Duration, Instant};

use chrono::serde::ts_seconds;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::lms::{HssConfig, HssPrivateKey, Result};

/// Metrics collected during one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    /// Parameter sets per level, top first
    pub parameters: Vec<String>,
    /// Time taken for key generation
    pub keygen_time: Duration,
    /// Total time spent signing
    pub signing_time: Duration,
    /// Total time spent verifying
    pub verification_time: Duration,
    /// Number of signatures produced
    pub signature_count: usize,
    /// Encoded size of one signature
    pub signature_size_bytes: usize,
    /// Whether every signature verified
    pub all_valid: bool,
    /// Timestamp of the benchmark run
    #[serde(with = "ts_seconds")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl BenchmarkMetrics {
    pub fn new(signature_count: usize) -> Self {
        Self {
            parameters: Vec::new(),
            keygen_time: Duration::default(),
            signing_time: Duration::default(),
            verification_time: Duration::default(),
            signature_count,
            signature_size_bytes: 0,
            all_valid: false,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Measure execution time of a closure
    pub fn measure_time<F, R>(f: F) -> (Duration, R)
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let duration = start.elapsed();
        (duration, result)
    }

    /// Generate a key, sign `count` messages and verify them all
    pub fn run<R: RngCore + CryptoRng>(
        config: &HssConfig,
        count: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let mut metrics = Self::new(count);
        metrics.parameters = config
            .levels
            .iter()
            .map(|level| format!("{}/{}", level.lms, level.lmots))
            .collect();

        let (keygen_time, key) = Self::measure_time(|| HssPrivateKey::generate(config, rng));
        let mut key = key?;
        metrics.keygen_time = keygen_time;
        let public = key.public_key();

        let messages: Vec<Vec<u8>> = (0..count)
            .map(|i| format!("Benchmark message {i}").into_bytes())
            .collect();

        let (signing_time, signatures) = Self::measure_time(|| {
            messages
                .iter()
                .map(|m| key.sign(m, rng))
                .collect::<Result<Vec<_>>>()
        });
        let signatures = signatures?;
        metrics.signing_time = signing_time;
        metrics.signature_size_bytes = signatures.first().map_or(0, |s| s.encoded_len());

        let (verification_time, all_valid) = Self::measure_time(|| {
            messages
                .iter()
                .zip(&signatures)
                .all(|(m, s)| public.verify(m, s))
        });
        metrics.verification_time = verification_time;
        metrics.all_valid = all_valid;

        info!(
            count,
            keygen = ?metrics.keygen_time,
            signing = ?metrics.signing_time,
            verification = ?metrics.verification_time,
            "benchmark run complete"
        );
        Ok(metrics)
    }
}

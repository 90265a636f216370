//! Search latency profiling.
//!
//! Times `backend.search` for every query, repeated `iterations` times, and
//! summarizes all samples. Queries run sequentially so that samples are not
//! distorted by contention. A failed search ends the measurement: its time is
//! never recorded, and the backend error is returned instead.

use crate::error::BackendError;
use crate::search::backend::{Query, SearchBackend};
use instant::Instant;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Summary of latency samples, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Mean latency
    pub mean_ms: f64,
    /// Median latency
    pub median_ms: f64,
    /// Sample standard deviation (0 for a single sample)
    pub std_ms: f64,
    /// Fastest sample
    pub min_ms: f64,
    /// Slowest sample
    pub max_ms: f64,
    /// Number of samples
    pub samples: usize,
    /// Queries per second implied by the mean (`1000 / mean_ms`, 0 if mean is 0)
    pub qps: f64,
}

impl LatencyStats {
    /// Summarizes samples in milliseconds. Returns `None` for no samples.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len();
        let mean = samples.iter().sum::<f64>() / n as f64;

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        let std = if n > 1 {
            let variance =
                samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Some(Self {
            mean_ms: mean,
            median_ms: median,
            std_ms: std,
            min_ms: sorted[0],
            max_ms: sorted[n - 1],
            samples: n,
            qps: if mean > 0.0 { 1000.0 / mean } else { 0.0 },
        })
    }
}

/// Measures search latency of `backend` over `queries`.
///
/// Fails with [`BackendError::InvalidRequest`] when there are no queries or
/// `iterations` is zero, and with the backend's own error when any search
/// fails.
pub fn measure_latency(
    backend: &dyn SearchBackend,
    queries: &[Query],
    top_k: usize,
    iterations: usize,
) -> Result<LatencyStats, BackendError> {
    if iterations == 0 {
        return Err(BackendError::InvalidRequest(
            "iterations must be at least 1".to_string(),
        ));
    }

    let mut samples = Vec::with_capacity(queries.len() * iterations);
    for query in queries {
        for _ in 0..iterations {
            let start = Instant::now();
            let result = backend.search(query, top_k);
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            if let Err(err) = result {
                warn!(
                    backend = backend.name(),
                    query_id = %query.id,
                    error = %err,
                    "Search failed, latency not measured"
                );
                return Err(err);
            }
            samples.push(elapsed_ms);
        }
    }

    let stats = LatencyStats::from_samples(&samples)
        .ok_or_else(|| BackendError::InvalidRequest("no queries to time".to_string()))?;

    info!(
        backend = backend.name(),
        mean_ms = stats.mean_ms,
        median_ms = stats.median_ms,
        qps = stats.qps,
        "Latency measured"
    );

    Ok(stats)
}

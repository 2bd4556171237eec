//! Fuzz test runner
//!
//! Thin wrapper over proptest's `TestRunner` that records a result per
//! property and logs a summary through `tracing`.

use std::cell::Cell;
use std::time::{Duration, Instant};

use proptest::strategy::Strategy;
use proptest::test_runner::{
    Config, RngAlgorithm, TestCaseError, TestError, TestRng, TestRunner,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Fuzz test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzConfig {
    /// Number of test cases to run
    pub cases: u32,
    /// Maximum shrink iterations on failure
    pub max_shrink_iters: u32,
    /// Random seed (0 = random)
    pub seed: u64,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
            seed: 0,
        }
    }
}

impl FuzzConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cases(mut self, n: u32) -> Self {
        self.cases = n;
        self
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = s;
        self
    }

    /// Generate proptest config from this
    pub fn to_proptest_config(&self) -> Config {
        let mut config = Config::default();
        config.cases = self.cases;
        config.max_shrink_iters = self.max_shrink_iters;
        if self.seed != 0 {
            config.rng_algorithm = RngAlgorithm::ChaCha;
        }
        config
    }

    fn test_runner(&self) -> TestRunner {
        let config = self.to_proptest_config();
        if self.seed == 0 {
            return TestRunner::new(config);
        }
        let mut seed = [0u8; 32];
        for chunk in seed.chunks_mut(8) {
            chunk.copy_from_slice(&self.seed.to_le_bytes());
        }
        TestRunner::new_with_rng(config, TestRng::from_seed(RngAlgorithm::ChaCha, &seed))
    }
}

// ============================================================================
// Results
// ============================================================================

/// Result of a fuzz test run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzResult {
    /// Test name
    pub name: String,
    /// Property evaluations, shrinking included
    pub cases_run: u64,
    pub duration_ms: f64,
    /// Failure message with the minimal failing input
    pub failure: Option<String>,
    pub passed: bool,
}

impl FuzzResult {
    fn finish(name: &str, cases_run: u64, elapsed: Duration, failure: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            cases_run,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            passed: failure.is_none(),
            failure,
        }
    }

    /// Cases per second
    pub fn throughput(&self) -> f64 {
        if self.duration_ms <= 0.0 {
            0.0
        } else {
            self.cases_run as f64 * 1000.0 / self.duration_ms
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Runs named properties and keeps their results
pub struct FuzzRunner {
    config: FuzzConfig,
    results: Vec<FuzzResult>,
}

impl FuzzRunner {
    pub fn new(config: FuzzConfig) -> Self {
        Self {
            config,
            results: Vec::new(),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(FuzzConfig::default())
    }

    /// Check `property` against values drawn from `strategy`
    pub fn run<S, F>(&mut self, name: &str, strategy: S, property: F) -> &FuzzResult
    where
        S: Strategy,
        F: Fn(S::Value) -> Result<(), TestCaseError>,
    {
        let mut runner = self.config.test_runner();
        let evaluations = Cell::new(0u64);
        let start = Instant::now();

        let outcome = runner.run(&strategy, |value| {
            evaluations.set(evaluations.get() + 1);
            property(value)
        });

        let failure = match outcome {
            Ok(()) => None,
            Err(TestError::Fail(reason, value)) => Some(format!("{} (input: {:?})", reason, value)),
            Err(TestError::Abort(reason)) => Some(format!("aborted: {}", reason)),
        };

        let result = FuzzResult::finish(name, evaluations.get(), start.elapsed(), failure);
        match &result.failure {
            None => info!(
                "{}: {} cases passed in {:.1} ms",
                result.name, result.cases_run, result.duration_ms
            ),
            Some(message) => warn!("{}: FAILED {}", result.name, message),
        }

        self.results.push(result);
        &self.results[self.results.len() - 1]
    }

    /// Get all results
    pub fn results(&self) -> &[FuzzResult] {
        &self.results
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Export results to JSON
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.results)
    }
}

//! Run reporting

use std::collections::BTreeMap;

use serde::Serialize;

use crate::runner::{ScenarioOutcome, ScenarioResult};

/// Aggregated outcome of a set of scenario runs
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    /// Total number of scenario runs
    pub total: usize,
    /// Runs where every case matched
    pub passed: usize,
    /// Runs with a mismatching case
    pub failed: usize,
    /// Runs whose body did not decode
    pub decode_failures: usize,
    /// Runs the backend could not compile
    pub backend_failures: usize,
    /// Pass rate as percentage
    pub pass_rate: f64,
    /// Counts per backend
    pub by_backend: BTreeMap<String, BackendReport>,
    /// Details of every run that did not pass
    pub failures: Vec<FailureInfo>,
}

/// Per-backend counts
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackendReport {
    /// Runs on this backend
    pub total: usize,
    /// Passed runs
    pub passed: usize,
}

/// A run that did not pass
#[derive(Debug, Clone, Serialize)]
pub struct FailureInfo {
    /// Scenario name
    pub scenario: String,
    /// Backend name
    pub backend: String,
    /// Error or mismatch description
    pub error: String,
}

impl HarnessReport {
    /// Generate a report from scenario results
    pub fn from_results(results: &[ScenarioResult]) -> Self {
        let mut report = Self {
            total: results.len(),
            passed: 0,
            failed: 0,
            decode_failures: 0,
            backend_failures: 0,
            pass_rate: 0.0,
            by_backend: BTreeMap::new(),
            failures: Vec::new(),
        };

        for result in results {
            let backend = report.by_backend.entry(result.backend.clone()).or_default();
            backend.total += 1;

            let error = match &result.outcome {
                ScenarioOutcome::Pass => {
                    report.passed += 1;
                    backend.passed += 1;
                    continue;
                }
                ScenarioOutcome::Fail { mismatch } => {
                    report.failed += 1;
                    mismatch.to_string()
                }
                ScenarioOutcome::DecodeFailure { error } => {
                    report.decode_failures += 1;
                    error.clone()
                }
                ScenarioOutcome::BackendFailure { error } => {
                    report.backend_failures += 1;
                    error.clone()
                }
            };
            report.failures.push(FailureInfo {
                scenario: result.name.clone(),
                backend: result.backend.clone(),
                error,
            });
        }

        if report.total > 0 {
            report.pass_rate = (report.passed as f64 / report.total as f64) * 100.0;
        }

        report
    }

    /// Whether every run passed
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    /// Print a summary to stdout
    pub fn print_summary(&self) {
        println!("\n=== wasmgraph Results ===");
        println!("Total:    {}", self.total);
        println!("Passed:   {} ({:.1}%)", self.passed, self.pass_rate);
        println!("Failed:   {}", self.failed);
        println!("Decode:   {}", self.decode_failures);
        println!("Backend:  {}", self.backend_failures);
        for (name, backend) in &self.by_backend {
            println!("  {name}: {}/{}", backend.passed, backend.total);
        }

        if !self.failures.is_empty() {
            println!("\n=== Failures (first 10) ===");
            for failure in self.failures.iter().take(10) {
                println!("  {} [{}] - {}", failure.scenario, failure.backend, failure.error);
            }
            if self.failures.len() > 10 {
                println!("  ... and {} more", self.failures.len() - 10);
            }
        }
    }

    /// Export to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

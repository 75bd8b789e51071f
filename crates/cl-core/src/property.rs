//! Post-run property checks.
//!
//! Checks run once the workers have joined and the structure is quiescent.
//! Each check yields a [`PropertyResult`]; a failing one may carry a
//! [`Counterexample`] with the seed and history needed to replay it.

use crate::counterexample::Counterexample;

/// Outcome of one named check.
#[derive(Debug, Clone)]
pub struct PropertyResult {
    /// Check name, e.g. `"StrictlyAscending"`.
    pub name: &'static str,

    pub holds: bool,

    /// What went wrong, present only when `holds` is false.
    pub violation: Option<String>,

    pub counterexample: Option<Counterexample>,
}

impl PropertyResult {
    #[must_use]
    pub fn pass(name: &'static str) -> Self {
        debug_assert!(!name.is_empty(), "Property name must not be empty");

        Self {
            name,
            holds: true,
            violation: None,
            counterexample: None,
        }
    }

    #[must_use]
    pub fn fail(
        name: &'static str,
        violation: String,
        counterexample: Option<Counterexample>,
    ) -> Self {
        debug_assert!(!name.is_empty(), "Property name must not be empty");
        debug_assert!(!violation.is_empty(), "A failure needs a description");

        Self {
            name,
            holds: false,
            violation: Some(violation),
            counterexample,
        }
    }

    /// One line: `[PASS] name` or `[FAIL] name: violation`.
    #[must_use]
    pub fn format_status(&self) -> String {
        match (&self.violation, self.holds) {
            (_, true) => format!("[PASS] {}", self.name),
            (Some(violation), false) => format!("[FAIL] {}: {}", self.name, violation),
            (None, false) => format!("[FAIL] {}: unknown", self.name),
        }
    }
}

/// Something that can evaluate a fixed list of named checks.
pub trait PropertyChecker {
    /// Evaluate every check, passing ones included.
    fn check_all(&self) -> Vec<PropertyResult>;

    /// `Err` with the first failing check, in `check_all` order.
    fn verify_all(&self) -> Result<(), PropertyResult> {
        match self.check_all().into_iter().find(|r| !r.holds) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn all_hold(&self) -> bool {
        self.check_all().iter().all(|r| r.holds)
    }

    /// Evaluate every check and tally the outcome.
    fn summary(&self) -> PropertySummary {
        let results = self.check_all();
        let total = results.len() as u64;
        let passed = results.iter().filter(|r| r.holds).count() as u64;

        PropertySummary {
            passed,
            failed: total - passed,
            total,
            results,
        }
    }
}

/// Tallied results of one [`PropertyChecker::summary`] call.
#[derive(Debug, Clone)]
pub struct PropertySummary {
    pub passed: u64,
    pub failed: u64,
    pub total: u64,
    pub results: Vec<PropertyResult>,
}

impl PropertySummary {
    /// Multi-line report: a tally, one status line per check, then the
    /// counterexample of the first failure if it has one.
    #[must_use]
    pub fn format_report(&self) -> String {
        let mut report = format!(
            "Property Check Summary: {}/{} passed\n",
            self.passed, self.total
        );

        for result in &self.results {
            report.push_str(&result.format_status());
            report.push('\n');
        }

        let first_counterexample = self
            .results
            .iter()
            .find(|r| !r.holds)
            .and_then(|r| r.counterexample.as_ref());
        if let Some(ce) = first_counterexample {
            report.push_str("\nCounterexample:\n");
            report.push_str(&ce.render_diagram());
        }

        report
    }
}

//! Reproduction data for a failed property.

/// A named view of the state at one step of a failing run.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Step number (1-based)
    pub step: u64,
    /// What happened at this step
    pub description: String,
    /// Relevant variables as `(name, rendered value)`
    pub variables: Vec<(String, String)>,
}

/// Everything needed to reproduce and explain a violation.
#[derive(Debug, Clone, Default)]
pub struct Counterexample {
    /// Seed that regenerates the run, if it was seeded
    pub dst_seed: Option<u64>,
    /// States leading to the violation, in order
    pub states: Vec<StateSnapshot>,
}

impl Counterexample {
    /// Create an empty counterexample without a seed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty counterexample reproducible with `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            dst_seed: Some(seed),
            states: Vec::new(),
        }
    }

    /// Append a state.
    pub fn add_state(&mut self, state: StateSnapshot) {
        debug_assert!(state.step > 0, "Step must be positive");
        self.states.push(state);
    }

    /// Render the states as a vertical diagram.
    ///
    /// ```text
    /// DST_SEED=42
    /// [1] key 7 inserted twice without a delete
    ///     |  inserts = 2
    ///     |  deletes = 0
    /// ```
    #[must_use]
    pub fn render_diagram(&self) -> String {
        let mut out = String::new();

        if let Some(seed) = self.dst_seed {
            out.push_str(&format!("DST_SEED={}\n", seed));
        }

        for state in &self.states {
            out.push_str(&format!("[{}] {}\n", state.step, state.description));
            for (name, value) in &state.variables {
                out.push_str(&format!("    |  {} = {}\n", name, value));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_seed() {
        let mut ce = Counterexample::with_seed(42);
        ce.add_state(StateSnapshot {
            step: 1,
            description: "key 7 lost".to_string(),
            variables: vec![("inserts".to_string(), "1".to_string())],
        });

        let diagram = ce.render_diagram();
        assert!(diagram.starts_with("DST_SEED=42\n"));
        assert!(diagram.contains("[1] key 7 lost"));
        assert!(diagram.contains("inserts = 1"));
    }

    #[test]
    fn test_render_without_seed() {
        let ce = Counterexample::new();
        assert!(ce.dst_seed.is_none());
        assert!(ce.render_diagram().is_empty());
    }
}

//! # Synthesis Configuration
//!
//! All numeric tuning knobs live in one immutable [`SynthConfig`] value
//! threaded explicitly into graph construction and the solver. A config is
//! fixed for the lifetime of one synthesis run; nothing reads ambient
//! global state.

/// Tuning parameters for one synthesis run.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Smallest integer the witness functions enumerate.
    pub int_min: i64,
    /// Largest integer the witness functions enumerate. Derived from the
    /// task's constants and examples during grammar binding.
    pub int_max: i64,
    /// Ancestor window length of the context model. Fixed by the model
    /// file when one is loaded.
    pub context_depth: usize,
    /// Smoothing probability assigned to rules the model has no entry
    /// for; also the floor applied to listed probabilities.
    pub default_prob: f64,
    /// Ignore the learned probabilities and weight every rule uniformly
    /// (matrix-domain benchmarks).
    pub uniform_weights: bool,
    /// Largest tensor rank the reshape witness enumerates.
    pub max_rank: usize,
    /// Initial score floor for the version-space search.
    pub floor_start: f64,
    /// Amount the floor drops each time no program is found.
    pub floor_step: f64,
    /// Absolute minimum floor; dropping below it reports exhaustion.
    pub floor_min: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            int_min: -5,
            int_max: 20,
            context_depth: 2,
            default_prob: 0.001,
            uniform_weights: false,
            max_rank: 3,
            floor_start: -5.0,
            floor_step: 3.0,
            floor_min: -1000.0,
        }
    }
}

impl SynthConfig {
    /// Inclusive integer domain as a range pair.
    pub fn int_range(&self) -> (i64, i64) {
        (self.int_min, self.int_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_floors_are_ordered() {
        let cfg = SynthConfig::default();
        assert!(cfg.floor_min < cfg.floor_start);
        assert!(cfg.floor_step > 0.0);
        assert!(cfg.int_min <= cfg.int_max);
    }
}

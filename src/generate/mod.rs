use anyhow::{Result, bail};

use crate::model::Op;

mod min_tree;
mod random_tree;

pub use min_tree::ShapeKeyedMinGenerator;
pub use random_tree::RandomTreeGenerator;

pub const DEFAULT_FRAC_LABELS: f64 = 0.5;
pub const DEFAULT_FRAC_AND: f64 = 0.5;
pub const DEFAULT_FRAC_VARIANCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// A uniform draw above this selects a label leaf, otherwise a metric leaf.
    pub frac_labels: f64,
    /// A uniform draw above this selects `And`, otherwise `Or`.
    pub frac_and: f64,
    /// Standard deviation of sampled thresholds as a fraction of the metric mean.
    pub frac_variance: f64,
    pub ops: Vec<Op>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            frac_labels: DEFAULT_FRAC_LABELS,
            frac_and: DEFAULT_FRAC_AND,
            frac_variance: DEFAULT_FRAC_VARIANCE,
            ops: Op::ALL.to_vec(),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("frac-labels", self.frac_labels),
            ("frac-and", self.frac_and),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must lie in [0, 1], got {value}");
            }
        }
        if !self.frac_variance.is_finite() || self.frac_variance < 0.0 {
            bail!(
                "frac-variance must be finite and non-negative, got {}",
                self.frac_variance
            );
        }
        if self.ops.is_empty() {
            bail!("operator set must not be empty");
        }
        Ok(())
    }
}

/// Truncates toward zero at three decimal places. Magnitudes too large to
/// scale carry no fractional digits and pass through unchanged.
pub fn truncate_millis(value: f64) -> f64 {
    let scaled = value * 1000.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.trunc() / 1000.0
}

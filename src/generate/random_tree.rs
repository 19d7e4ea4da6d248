use anyhow::{Context, Result};
use rand::Rng;
use rand::distributions::Standard;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal};

use super::{GeneratorConfig, truncate_millis};
use crate::model::{Condition, Metadata};

/// Builds perfect binary condition trees by independent sampling at every node.
pub struct RandomTreeGenerator<'a> {
    config: &'a GeneratorConfig,
    metadata: &'a Metadata,
    label_keys: Vec<&'a str>,
    metric_keys: Vec<&'a str>,
}

impl<'a> RandomTreeGenerator<'a> {
    pub fn new(config: &'a GeneratorConfig, metadata: &'a Metadata) -> Self {
        Self {
            config,
            metadata,
            label_keys: metadata.labels.keys().map(String::as_str).collect(),
            metric_keys: metadata.metrics.keys().map(String::as_str).collect(),
        }
    }

    pub fn generate<R: Rng + ?Sized>(&self, height: usize, rng: &mut R) -> Result<Condition> {
        if height == 0 {
            let draw: f64 = Standard.sample(rng);
            return if draw > self.config.frac_labels {
                self.label_leaf(rng)
            } else {
                self.metric_leaf(rng)
            };
        }

        let draw: f64 = Standard.sample(rng);
        let is_and = draw > self.config.frac_and;
        let lhs = self.generate(height - 1, rng)?;
        let rhs = self.generate(height - 1, rng)?;

        Ok(if is_and {
            Condition::and(lhs, rhs)
        } else {
            Condition::or(lhs, rhs)
        })
    }

    fn label_leaf<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Condition> {
        let key = *self
            .label_keys
            .choose(rng)
            .context("cannot generate a label leaf: no labels observed")?;
        let value = self.metadata.labels[key]
            .choose(rng)
            .with_context(|| format!("label {key} has no observed values"))?;

        Ok(Condition::label_eq(key, value))
    }

    fn metric_leaf<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Condition> {
        let name = *self
            .metric_keys
            .choose(rng)
            .context("cannot generate a metric leaf: no metrics observed")?;
        let mean = self.metadata.metrics[name];
        let std_dev = (mean * self.config.frac_variance).abs();
        let normal = Normal::new(mean, std_dev)
            .with_context(|| format!("invalid threshold distribution for metric {name}"))?;
        // Samples around extreme means can overflow; keep thresholds encodable.
        let threshold = truncate_millis(normal.sample(rng).clamp(f64::MIN, f64::MAX));
        let op = *self
            .config
            .ops
            .choose(rng)
            .context("cannot generate a metric leaf: operator set is empty")?;

        Ok(Condition::metric_cmp(name, op, threshold))
    }
}

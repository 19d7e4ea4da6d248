use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::ingest::SeriesIndex;
use crate::model::{Condition, Op, Record};

/// Relative (and minimum absolute) distance between a witness value and the
/// threshold of a strict comparison.
const WITNESS_MARGIN: f64 = 1e-3;

/// A condition together with the record that is known to satisfy it.
#[derive(Debug)]
pub struct WitnessedCondition<'a> {
    pub shape_key: &'a str,
    pub witness: &'a Record,
    pub condition: Condition,
}

/// Builds fixed-shape conditions that the first record of a randomly chosen
/// series is guaranteed to satisfy.
pub struct ShapeKeyedMinGenerator<'a> {
    index: &'a SeriesIndex,
    shape_keys: Vec<&'a str>,
}

impl<'a> ShapeKeyedMinGenerator<'a> {
    pub fn new(index: &'a SeriesIndex) -> Self {
        Self {
            index,
            shape_keys: index.keys().map(String::as_str).collect(),
        }
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<WitnessedCondition<'a>> {
        let shape_key = *self
            .shape_keys
            .choose(rng)
            .context("cannot generate a minimum condition: series index is empty")?;
        let index: &'a SeriesIndex = self.index;
        let witness = index[shape_key]
            .first()
            .with_context(|| format!("series {shape_key} has no records"))?;

        let condition = witness_condition(witness, rng)
            .with_context(|| format!("cannot build a condition for series {shape_key}"))?;

        Ok(WitnessedCondition {
            shape_key,
            witness,
            condition,
        })
    }
}

/// `And(Or(And(label, metric), metric), label)` over the witness's own values.
pub fn witness_condition<R: Rng + ?Sized>(witness: &Record, rng: &mut R) -> Result<Condition> {
    let labels: Vec<(&String, &String)> = witness.labels.iter().collect();
    let metrics: Vec<(&String, &f64)> = witness.metrics.iter().collect();

    let head_label = label_leaf(&labels, rng)?;
    let head_metric = metric_leaf(&metrics, rng)?;
    let alt_metric = metric_leaf(&metrics, rng)?;
    let tail_label = label_leaf(&labels, rng)?;

    Ok(Condition::and(
        Condition::or(Condition::and(head_label, head_metric), alt_metric),
        tail_label,
    ))
}

fn label_leaf<R: Rng + ?Sized>(labels: &[(&String, &String)], rng: &mut R) -> Result<Condition> {
    let (key, value) = *labels.choose(rng).context("witness record has no labels")?;
    Ok(Condition::label_eq(key, value))
}

fn metric_leaf<R: Rng + ?Sized>(metrics: &[(&String, &f64)], rng: &mut R) -> Result<Condition> {
    let (name, value) = *metrics.choose(rng).context("witness record has no metrics")?;
    let op = *Op::ORDERED
        .choose(rng)
        .context("ordered operator set is empty")?;
    let (op, threshold) = witness_comparison(op, *value);

    Ok(Condition::metric_cmp(name, op, threshold))
}

/// Operator and finite threshold for which `value <op> threshold` holds.
/// A strict comparison whose shifted threshold would overflow falls back to
/// its inclusive form at the exact value.
fn witness_comparison(op: Op, value: f64) -> (Op, f64) {
    let margin = (value.abs() * WITNESS_MARGIN).max(WITNESS_MARGIN);
    let (shifted, inclusive) = match op {
        Op::Gt => (value - margin, Op::GtEq),
        Op::Lt => (value + margin, Op::LtEq),
        _ => return (op, value),
    };

    if shifted.is_finite() {
        (op, shifted)
    } else {
        (inclusive, value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::ingest::build_series_index;
    use crate::model::{Operand, eval};

    fn record(labels: &[(&str, &str)], metrics: &[(&str, f64)]) -> Record {
        Record {
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            metrics: metrics.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn index() -> SeriesIndex {
        build_series_index(vec![
            record(&[("host", "a"), ("dc", "x")], &[("cpu", 50.0), ("mem", 0.0)]),
            record(&[("host", "a"), ("dc", "x")], &[("cpu", 70.0), ("mem", 1.0)]),
            record(&[("host", "b")], &[("cpu", -3.25)]),
        ])
    }

    #[test]
    fn condition_has_fixed_shape() {
        let index = index();
        let generator = ShapeKeyedMinGenerator::new(&index);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let generated = generator.generate(&mut rng).expect("generate condition");
        let Condition::And(outer_lhs, tail) = &generated.condition else {
            panic!("root must be And: {:?}", generated.condition);
        };
        let Condition::Or(inner_and, alt_metric) = outer_lhs.as_ref() else {
            panic!("left of root must be Or: {outer_lhs:?}");
        };
        let Condition::And(head_label, head_metric) = inner_and.as_ref() else {
            panic!("left of Or must be And: {inner_and:?}");
        };

        for label in [head_label.as_ref(), tail.as_ref()] {
            let Condition::Leaf(leaf) = label else {
                panic!("expected label leaf: {label:?}");
            };
            assert!(matches!(leaf.lhs, Operand::LabelKey(_)));
            assert_eq!(leaf.op, Op::Eq);
        }
        for metric in [head_metric.as_ref(), alt_metric.as_ref()] {
            let Condition::Leaf(leaf) = metric else {
                panic!("expected metric leaf: {metric:?}");
            };
            assert!(matches!(leaf.lhs, Operand::Variable(_)));
            assert!(Op::ORDERED.contains(&leaf.op));
        }
    }

    #[test]
    fn witness_is_first_record_of_chosen_series() {
        let index = index();
        let generator = ShapeKeyedMinGenerator::new(&index);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        for _ in 0..20 {
            let generated = generator.generate(&mut rng).expect("generate condition");
            assert_eq!(generated.witness, &index[generated.shape_key][0]);
        }
    }

    #[test]
    fn label_leaves_use_observed_values() {
        let witness = record(&[("host", "a")], &[("cpu", 50.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let condition = witness_condition(&witness, &mut rng).expect("generate condition");
        for leaf in condition.leaves() {
            match (&leaf.lhs, &leaf.rhs) {
                (Operand::LabelKey(key), Operand::LabelValue(value)) => {
                    assert_eq!((key.as_str(), value.as_str()), ("host", "a"));
                }
                (Operand::Variable(name), Operand::Metric(_)) => assert_eq!(name, "cpu"),
                other => panic!("inconsistent leaf operands: {other:?}"),
            }
        }
    }

    #[test]
    fn inclusive_operators_keep_exact_value() {
        assert_eq!(witness_comparison(Op::GtEq, 12.5), (Op::GtEq, 12.5));
        assert_eq!(witness_comparison(Op::LtEq, 12.5), (Op::LtEq, 12.5));

        let (op, threshold) = witness_comparison(Op::Gt, 0.0);
        assert_eq!(op, Op::Gt);
        assert!(threshold < 0.0);

        let (op, threshold) = witness_comparison(Op::Lt, 1.0e300);
        assert_eq!(op, Op::Lt);
        assert!(threshold > 1.0e300);
    }

    #[test]
    fn strict_operators_at_float_extremes_stay_finite() {
        assert_eq!(witness_comparison(Op::Lt, f64::MAX), (Op::LtEq, f64::MAX));
        assert_eq!(witness_comparison(Op::Gt, f64::MIN), (Op::GtEq, f64::MIN));

        let (op, threshold) = witness_comparison(Op::Gt, f64::MAX);
        assert_eq!(op, Op::Gt);
        assert!(threshold.is_finite() && threshold < f64::MAX);
    }

    #[test]
    fn extreme_witness_values_serialize_as_numbers() {
        for value in [f64::MAX, f64::MIN] {
            let witness = record(&[("host", "a")], &[("cpu", value)]);

            for seed in 0..50 {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let condition = witness_condition(&witness, &mut rng).expect("generate condition");
                assert!(eval::holds(&condition, &witness), "{condition:?}");

                let json = serde_json::to_string(&condition).expect("serialize condition");
                assert!(!json.contains("null"), "{json}");
            }
        }
    }

    #[test]
    fn empty_index_is_an_error() {
        let index = SeriesIndex::new();
        let generator = ShapeKeyedMinGenerator::new(&index);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let err = generator.generate(&mut rng).expect_err("nothing to choose");
        assert!(err.to_string().contains("series index is empty"), "{err}");
    }

    #[test]
    fn witness_without_metrics_is_an_error() {
        let index = build_series_index(vec![record(&[("host", "a")], &[])]);
        let generator = ShapeKeyedMinGenerator::new(&index);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let err = generator.generate(&mut rng).expect_err("no metric to compare");
        assert!(format!("{err:#}").contains("no metrics"), "{err:#}");
    }

    fn arb_record() -> impl Strategy<Value = Record> {
        let labels = prop::collection::btree_map("[a-d]{1,3}", "[a-z0-9]{0,4}", 1..4);
        let value = prop::num::f64::POSITIVE
            | prop::num::f64::NEGATIVE
            | prop::num::f64::NORMAL
            | prop::num::f64::SUBNORMAL
            | prop::num::f64::ZERO;
        let metrics = prop::collection::btree_map("[m-p]{1,3}", value, 1..4);
        (labels, metrics).prop_map(|(labels, metrics)| Record { labels, metrics })
    }

    proptest! {
        #[test]
        fn witness_always_satisfies_generated_condition(
            records in prop::collection::vec(arb_record(), 1..12),
            seed in any::<u64>(),
        ) {
            let index = build_series_index(records);
            let generator = ShapeKeyedMinGenerator::new(&index);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            for _ in 0..8 {
                let generated = generator.generate(&mut rng).expect("generate condition");
                prop_assert!(
                    eval::holds(&generated.condition, generated.witness),
                    "{:?} does not hold for {:?}",
                    generated.condition,
                    generated.witness
                );
            }
        }

        #[test]
        fn repeated_generation_on_one_series_stays_satisfiable(seed in any::<u64>()) {
            let witness = Record {
                labels: BTreeMap::from([("host".to_string(), "a".to_string())]),
                metrics: BTreeMap::from([("cpu".to_string(), 0.001)]),
            };
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            for _ in 0..8 {
                let condition = witness_condition(&witness, &mut rng).expect("generate condition");
                prop_assert!(eval::holds(&condition, &witness));
            }
        }
    }
}

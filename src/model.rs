use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const SELECT_NAME: &str = "generated_select";
pub const PREDICATE_NAME: &str = "generated_predicate";

/// One line of a workload file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum WorkloadEvent {
    Write(Record),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub labels: BTreeMap<String, String>,
    #[serde(rename = "variables")]
    pub metrics: BTreeMap<String, f64>,
}

/// Distinct observed values per label key, sorted.
pub type LabelDomain = BTreeMap<String, Vec<String>>;

/// Mean observed value per metric name.
pub type MetricProfile = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    pub labels: LabelDomain,
    pub metrics: MetricProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Select(Select),
}

impl Query {
    pub fn select(condition: Condition) -> Self {
        Self::Select(Select {
            name: SELECT_NAME.to_string(),
            predicate: Predicate {
                name: PREDICATE_NAME.to_string(),
                condition,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub name: String,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub name: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Leaf(Leaf),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    pub fn and(lhs: Condition, rhs: Condition) -> Self {
        Self::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Condition, rhs: Condition) -> Self {
        Self::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn label_eq(key: &str, value: &str) -> Self {
        Self::Leaf(Leaf {
            lhs: Operand::LabelKey(key.to_string()),
            rhs: Operand::LabelValue(value.to_string()),
            op: Op::Eq,
        })
    }

    pub fn metric_cmp(name: &str, op: Op, threshold: f64) -> Self {
        Self::Leaf(Leaf {
            lhs: Operand::Variable(name.to_string()),
            rhs: Operand::Metric(threshold),
            op,
        })
    }

    /// Longest root-to-leaf path, counted in branch nodes.
    pub fn height(&self) -> usize {
        match self {
            Self::Leaf(_) => 0,
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => 1 + lhs.height().max(rhs.height()),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => lhs.leaf_count() + rhs.leaf_count(),
        }
    }
}

#[cfg(test)]
impl Condition {
    /// True when every leaf sits at exactly `depth` branches below this node.
    pub fn is_perfect(&self, depth: usize) -> bool {
        match self {
            Self::Leaf(_) => depth == 0,
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                depth > 0 && lhs.is_perfect(depth - 1) && rhs.is_perfect(depth - 1)
            }
        }
    }

    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            Self::Leaf(leaf) => out.push(leaf),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_leaves(out);
                rhs.collect_leaves(out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub lhs: Operand,
    pub rhs: Operand,
    pub op: Op,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    LabelKey(String),
    LabelValue(String),
    Variable(String),
    Metric(f64),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Op {
    Eq,
    NEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
}

impl Op {
    pub const ALL: [Op; 6] = [Op::Eq, Op::NEq, Op::Gt, Op::Lt, Op::GtEq, Op::LtEq];
    pub const ORDERED: [Op; 4] = [Op::Gt, Op::Lt, Op::GtEq, Op::LtEq];
}

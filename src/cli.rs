use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::generate::{
    DEFAULT_FRAC_AND, DEFAULT_FRAC_LABELS, DEFAULT_FRAC_VARIANCE, GeneratorConfig,
};
use crate::model::Op;

#[derive(Parser, Debug)]
#[command(
    name = "workgen",
    version,
    about = "Workload metadata extraction and query generation for condition engines"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the label domain and metric means of a workload
    Metadata(MetadataArgs),
    /// Generate random condition trees from workload metadata
    Queries(QueriesArgs),
    /// Generate fixed-shape conditions satisfied by a recorded series
    MinQueries(MinQueriesArgs),
}

#[derive(Args, Debug, Clone)]
pub struct MetadataArgs {
    /// Newline-delimited JSON workload file
    pub workload: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct QueriesArgs {
    /// Newline-delimited JSON workload file
    pub workload: Option<PathBuf>,

    /// Treat the input as the two-line output of `workgen metadata`
    #[arg(long, default_value_t = false)]
    pub from_metadata: bool,

    #[arg(long, default_value_t = 100)]
    pub count: usize,

    #[arg(long, default_value_t = 3)]
    pub max_height: usize,

    #[arg(long, default_value_t = DEFAULT_FRAC_LABELS)]
    pub frac_labels: f64,

    #[arg(long, default_value_t = DEFAULT_FRAC_AND)]
    pub frac_and: f64,

    #[arg(long, default_value_t = DEFAULT_FRAC_VARIANCE)]
    pub frac_variance: f64,

    #[arg(long, value_enum, value_delimiter = ',')]
    pub ops: Vec<OpArg>,

    /// Restrict metric operators to gt, lt, gt-eq and lt-eq
    #[arg(long, default_value_t = false, conflicts_with = "ops")]
    pub ordered_ops: bool,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

impl QueriesArgs {
    pub fn generator_config(&self) -> GeneratorConfig {
        let ops = if self.ordered_ops {
            Op::ORDERED.to_vec()
        } else if self.ops.is_empty() {
            Op::ALL.to_vec()
        } else {
            self.ops.iter().map(|op| op.as_op()).collect()
        };

        GeneratorConfig {
            frac_labels: self.frac_labels,
            frac_and: self.frac_and,
            frac_variance: self.frac_variance,
            ops,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct MinQueriesArgs {
    /// Newline-delimited JSON workload file
    pub workload: Option<PathBuf>,

    #[arg(long, default_value_t = 100)]
    pub count: usize,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OpArg {
    Eq,
    NEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
}

impl OpArg {
    pub fn as_op(self) -> Op {
        match self {
            Self::Eq => Op::Eq,
            Self::NEq => Op::NEq,
            Self::Gt => Op::Gt,
            Self::Lt => Op::Lt,
            Self::GtEq => Op::GtEq,
            Self::LtEq => Op::LtEq,
        }
    }
}

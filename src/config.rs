use crate::error::Result;
use crate::problem::Parameters;
use crate::solvers::{RelaxationConfig, SparseMethod};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Which strategy solves the system at each time level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SolverConfig {
    Dense,
    Sparse { method: SparseMethod },
    Relaxation(RelaxationConfig),
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig::Dense
    }
}

/// Everything needed to set up a run apart from the initial, source and boundary functions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub parameters: Parameters,
    pub solver: SolverConfig,
}

impl RunConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(fs::File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

//! The three interchangeable ways of advancing the field by one time level.
pub mod dense;
pub mod relaxation;
pub mod sparse;

pub use dense::DenseSolver;
pub use relaxation::{Iteration, RelaxationConfig, RelaxationSolver, RelaxationStop, Version};
pub use sparse::{SparseMethod, SparseSolver};

use crate::error::Result;
use crate::linalg::KrylovStatus;
use crate::problem::EdgeValues;
use ndarray::prelude::*;
use std::fmt;

/// Data that changes from step to step and is shared by every strategy
#[derive(Debug)]
pub struct StepInput<'a> {
    /// Index of the level being computed, `n + 1`
    pub level: usize,
    /// Boundary values at the new level
    pub boundary: EdgeValues,
    /// Source term sampled at the previous level
    pub f_n: ArrayView2<'a, f64>,
    /// Source term sampled at the new level
    pub f_np1: ArrayView2<'a, f64>,
}

/// Diagnostics from one step. Nothing here stops a run; fatal conditions are errors instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepReport {
    /// Solved by a direct factorization
    Direct,
    Krylov {
        iterations: usize,
        /// Final residual relative to the right-hand side
        residual: f64,
        status: KrylovStatus,
    },
    Relaxation {
        iterations: usize,
        /// Largest change over the final sweep
        max_change: f64,
        stop: RelaxationStop,
    },
}

impl StepReport {
    /// Did the solve meet its tolerance? Direct solves always do.
    pub fn converged(&self) -> bool {
        match self {
            StepReport::Direct => true,
            StepReport::Krylov { status, .. } => *status == KrylovStatus::Converged,
            StepReport::Relaxation { stop, .. } => *stop == RelaxationStop::Converged,
        }
    }

    /// Iterations used, zero for direct solves
    pub fn iterations(&self) -> usize {
        match self {
            StepReport::Direct => 0,
            StepReport::Krylov { iterations, .. } | StepReport::Relaxation { iterations, .. } => {
                *iterations
            }
        }
    }
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StepReport::Direct => write!(f, "direct solve"),
            StepReport::Krylov {
                iterations,
                residual,
                status,
            } => write!(
                f,
                "{:?} after {} iterations (relative residual {:.3e})",
                status, iterations, residual
            ),
            StepReport::Relaxation {
                iterations,
                max_change,
                stop,
            } => write!(
                f,
                "{:?} after {} iterations (max change {:.3e})",
                stop, iterations, max_change
            ),
        }
    }
}

/// One strategy for solving the theta-rule system at each time level. Implementors build
/// whatever is constant over the run (operators, factorizations, work arrays) when constructed.
pub trait StepSolver {
    /// Short name used in logs
    fn name(&self) -> String;

    /// Compute the field at the new level into `u`, given the previous level `u_prev`
    fn step(
        &mut self,
        input: &StepInput,
        u_prev: ArrayView2<f64>,
        u: ArrayViewMut2<f64>,
    ) -> Result<StepReport>;
}

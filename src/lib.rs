pub mod assembly;
pub mod config;
pub mod dof_handler;
pub mod error;
pub mod linalg;
pub mod mesh;
pub mod problem;
pub mod solvers;
pub mod stencil;
pub mod timestepping;
pub mod utilities;

extern crate ndarray;

pub use config::{RunConfig, SolverConfig};
pub use error::{DiffusionError, Result};
pub use problem::{BoundaryValue, Boundaries, DiffusionProblem, Parameters};
pub use solvers::{Iteration, RelaxationConfig, SparseMethod, StepReport, Version};
pub use timestepping::{solve, solve_dense, solve_relaxation, solve_sparse, RunSummary, StepView};

use super::{StepInput, StepReport, StepSolver};
use crate::assembly::{explicit_part_sliced, impose_boundary, sparse_matrix};
use crate::dof_handler::DofHandler;
use crate::error::{DiffusionError, Result};
use crate::linalg::{pcg, CgWorkspace, CsrMatrix, Ilu0, KrylovStatus, SparseLu};
use crate::problem::Discretization;
use crate::stencil::ThetaStencil;
use log::warn;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

/// How the sparse system is solved at each step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparseMethod {
    /// Sparse LU with row pivoting, factorized once
    Direct,
    /// ILU(0)-preconditioned conjugate gradients started from the previous level
    Cg { tol: f64 },
}

impl Default for SparseMethod {
    fn default() -> Self {
        SparseMethod::Direct
    }
}

enum Backend {
    Direct(SparseLu),
    Cg {
        tol: f64,
        max_iter: usize,
        ilu: Ilu0,
        workspace: CgWorkspace,
        start: Array2<f64>,
    },
}

/// Five-diagonal strategy
pub struct SparseSolver {
    stencil: ThetaStencil,
    dofs: DofHandler,
    matrix: CsrMatrix,
    backend: Backend,
    rhs: Array2<f64>,
    b: Vec<f64>,
    x: Vec<f64>,
}

impl SparseSolver {
    pub fn new(disc: &Discretization, method: SparseMethod) -> Result<Self> {
        let matrix = sparse_matrix(&disc.stencil, &disc.mesh, &disc.dofs);
        let n = disc.dofs.n_dofs();

        let backend = match method {
            SparseMethod::Direct => Backend::Direct(SparseLu::new(&matrix)?),
            SparseMethod::Cg { tol } => {
                if !(tol > 0.0) {
                    return Err(DiffusionError::InvalidParameter {
                        name: "cg_tol",
                        value: tol,
                        reason: "must be positive",
                    });
                }
                Backend::Cg {
                    tol,
                    max_iter: n,
                    ilu: Ilu0::new(&matrix)?,
                    workspace: CgWorkspace::new(n),
                    start: disc.mesh.zeros(),
                }
            }
        };

        Ok(SparseSolver {
            stencil: disc.stencil,
            dofs: disc.dofs,
            matrix,
            backend,
            rhs: disc.mesh.zeros(),
            b: vec![0.0; n],
            x: vec![0.0; n],
        })
    }
}

impl StepSolver for SparseSolver {
    fn name(&self) -> String {
        match self.backend {
            Backend::Direct(_) => "sparse direct".into(),
            Backend::Cg { tol, .. } => format!("sparse CG+ILU(0) (tol {:e})", tol),
        }
    }

    fn step(
        &mut self,
        input: &StepInput,
        u_prev: ArrayView2<f64>,
        mut u: ArrayViewMut2<f64>,
    ) -> Result<StepReport> {
        explicit_part_sliced(&self.stencil, u_prev, input.f_n, input.f_np1, &mut self.rhs);
        impose_boundary(self.rhs.view_mut(), input.boundary);
        self.dofs.flatten_into(self.rhs.view(), &mut self.b);

        let report = match &mut self.backend {
            Backend::Direct(lu) => {
                self.x.copy_from_slice(&self.b);
                if !lu.solve_in_place(&mut self.x) {
                    return Err(DiffusionError::SingularSystem {
                        step: Some(input.level),
                    });
                }
                StepReport::Direct
            }
            Backend::Cg {
                tol,
                max_iter,
                ilu,
                workspace,
                start,
            } => {
                // Start on the new boundary values, so the boundary rows hold from the outset
                start.assign(&u_prev);
                impose_boundary(start.view_mut(), input.boundary);
                self.dofs.flatten_into(start.view(), &mut self.x);

                let outcome = pcg(
                    &self.matrix,
                    &self.b,
                    &mut self.x,
                    ilu,
                    *tol,
                    *max_iter,
                    workspace,
                );

                match outcome.status {
                    KrylovStatus::Converged => {}
                    KrylovStatus::NotConverged => warn!(
                        "CG: tolerance {:e} not achieved within {} iterations at level {}",
                        tol, outcome.iterations, input.level
                    ),
                    KrylovStatus::Breakdown => warn!(
                        "CG breakdown after {} iterations at level {}",
                        outcome.iterations, input.level
                    ),
                }

                StepReport::Krylov {
                    iterations: outcome.iterations,
                    residual: outcome.residual,
                    status: outcome.status,
                }
            }
        };

        self.dofs.unflatten_into(&self.x, u.view_mut());
        // Pivoting in the direct solve can leave rounding on the identity rows
        impose_boundary(u, input.boundary);
        Ok(report)
    }
}

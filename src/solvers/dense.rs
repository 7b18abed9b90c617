use super::{StepInput, StepReport, StepSolver};
use crate::assembly::{dense_matrix, explicit_part_nodewise, impose_boundary};
use crate::dof_handler::DofHandler;
use crate::error::{DiffusionError, Result};
use crate::problem::Discretization;
use crate::stencil::ThetaStencil;
use nalgebra::linalg::LU;
use nalgebra::{DVector, Dyn};
use ndarray::prelude::*;

/// Full-matrix strategy. The operator is factorized with partial pivoting once and the
/// factors reused for every right-hand side.
pub struct DenseSolver {
    stencil: ThetaStencil,
    dofs: DofHandler,
    lu: LU<f64, Dyn, Dyn>,
    rhs: Array2<f64>,
    b: DVector<f64>,
}

impl DenseSolver {
    pub fn new(disc: &Discretization) -> Result<Self> {
        let a = dense_matrix(&disc.stencil, &disc.mesh, &disc.dofs);
        let lu = a.lu();
        if !lu.is_invertible() {
            return Err(DiffusionError::SingularSystem { step: None });
        }

        Ok(DenseSolver {
            stencil: disc.stencil,
            dofs: disc.dofs,
            lu,
            rhs: disc.mesh.zeros(),
            b: DVector::zeros(disc.dofs.n_dofs()),
        })
    }
}

impl StepSolver for DenseSolver {
    fn name(&self) -> String {
        "dense".into()
    }

    fn step(
        &mut self,
        input: &StepInput,
        u_prev: ArrayView2<f64>,
        mut u: ArrayViewMut2<f64>,
    ) -> Result<StepReport> {
        explicit_part_nodewise(&self.stencil, u_prev, input.f_n, input.f_np1, &mut self.rhs);
        impose_boundary(self.rhs.view_mut(), input.boundary);
        self.dofs.flatten_into(self.rhs.view(), self.b.as_mut_slice());

        if !self.lu.solve_mut(&mut self.b) {
            return Err(DiffusionError::SingularSystem {
                step: Some(input.level),
            });
        }

        self.dofs.unflatten_into(self.b.as_slice(), u.view_mut());
        // Row exchanges can leave rounding on the identity rows
        impose_boundary(u, input.boundary);
        Ok(StepReport::Direct)
    }
}

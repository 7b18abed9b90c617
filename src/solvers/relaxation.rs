use super::{StepInput, StepReport, StepSolver};
use crate::assembly::{explicit_part_nodewise, explicit_part_sliced, impose_boundary};
use crate::error::{DiffusionError, Result};
use crate::problem::Discretization;
use crate::stencil::ThetaStencil;
use crate::utilities::max_abs_diff;
use log::{info, warn};
use ndarray::prelude::*;
use ndarray::{Slice, Zip};
use serde::{Deserialize, Serialize};

/// Node-by-node loops or whole-array slice updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Version {
    Scalar,
    Vectorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Iteration {
    Jacobi,
    /// Successive over-relaxation. Red-black ordered in the vectorized version.
    Sor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxationConfig {
    pub version: Version,
    pub iteration: Iteration,
    /// Relaxation factor
    pub omega: f64,
    /// Cap on sweeps per time step
    pub max_iter: usize,
    /// Stop once no node changes by this much over a sweep
    pub tol: f64,
}

impl Default for RelaxationConfig {
    fn default() -> Self {
        RelaxationConfig {
            version: Version::Vectorized,
            iteration: Iteration::Jacobi,
            omega: 1.0,
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

/// Why the sweeps of a step stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxationStop {
    Converged,
    IterationCap,
}

/// Slices `(centre, minus one, plus one)` along one axis selecting every other interior node,
/// starting from node `first` (1 or 2)
fn colour(first: isize) -> [Slice; 3] {
    [
        Slice::new(first, Some(-1), 2),
        Slice::new(first - 1, Some(-2), 2),
        Slice::new(first + 1, None, 2),
    ]
}

/// All interior nodes along one axis
fn interior() -> [Slice; 3] {
    [
        Slice::new(1, Some(-1), 1),
        Slice::new(0, Some(-2), 1),
        Slice::new(2, None, 1),
    ]
}

/// Order of the four colour passes of red-black SOR, as the first `(i, j)` of each
const COLOUR_PASSES: [(isize, isize); 4] = [(1, 1), (2, 2), (2, 1), (1, 2)];

/// Solve the interior equations at the nodes selected by `ix` and `jy` for their centre
/// values, reading neighbours from `neighbours`, and write them into `out`
fn update_nodes(
    stencil: &ThetaStencil,
    out: &mut Array2<f64>,
    neighbours: ArrayView2<f64>,
    explicit: ArrayView2<f64>,
    ix: [Slice; 3],
    jy: [Slice; 3],
) {
    let [ic, im, ip] = ix;
    let [jc, jm, jp] = jy;

    out.slice_mut(s![ic, jc]).assign(&explicit.slice(s![ic, jc]));

    Zip::from(out.slice_mut(s![ic, jc]))
        .and(neighbours.slice(s![im, jc]))
        .and(neighbours.slice(s![ip, jc]))
        .and(neighbours.slice(s![ic, jm]))
        .and(neighbours.slice(s![ic, jp]))
        .for_each(|centre, &west, &east, &south, &north| {
            *centre = stencil.implicit_update(west, east, south, north, *centre);
        });
}

/// Jacobi or SOR iteration on the stencil. No matrix is formed.
pub struct RelaxationSolver {
    config: RelaxationConfig,
    stencil: ThetaStencil,
    /// Explicit part of each interior equation for the current step
    explicit: Array2<f64>,
    /// Most recent complete iterate
    latest: Array2<f64>,
    /// Unrelaxed update of the vectorized versions
    update: Array2<f64>,
    /// Copy of `update` read by each colour pass
    sweep: Array2<f64>,
}

impl RelaxationSolver {
    pub fn new(disc: &Discretization, config: RelaxationConfig) -> Result<Self> {
        if !(config.omega > 0.0 && config.omega < 2.0) {
            return Err(DiffusionError::InvalidParameter {
                name: "omega",
                value: config.omega,
                reason: "relaxation factor must lie in (0, 2)",
            });
        }
        if !(config.tol > 0.0) {
            return Err(DiffusionError::InvalidParameter {
                name: "tol",
                value: config.tol,
                reason: "must be positive",
            });
        }
        if config.max_iter == 0 {
            return Err(DiffusionError::InvalidParameter {
                name: "max_iter",
                value: 0.0,
                reason: "at least one sweep is needed",
            });
        }

        let (nx, ny) = (disc.mesh.nx(), disc.mesh.ny());
        if config.version == Version::Vectorized
            && config.iteration == Iteration::Sor
            && (nx % 2 != 0 || ny % 2 != 0)
        {
            return Err(DiffusionError::invalid_mesh(format!(
                "vectorized SOR requires even Nx and Ny ({}x{})",
                nx, ny
            )));
        }

        Ok(RelaxationSolver {
            config,
            stencil: disc.stencil,
            explicit: disc.mesh.zeros(),
            latest: disc.mesh.zeros(),
            update: disc.mesh.zeros(),
            sweep: disc.mesh.zeros(),
        })
    }

    /// Node-by-node sweep, `j` outer. Jacobi reads every neighbour from the last iterate, SOR
    /// reads the west and south neighbours from `u` as updated earlier in this sweep.
    fn sweep_scalar(&self, u: &mut ArrayViewMut2<f64>) {
        let (n_x, n_y) = u.dim();
        let omega = self.config.omega;
        let latest = &self.latest;

        for j in 1..n_y - 1 {
            for i in 1..n_x - 1 {
                let (west, south) = match self.config.iteration {
                    Iteration::Jacobi => (latest[[i - 1, j]], latest[[i, j - 1]]),
                    Iteration::Sor => (u[[i - 1, j]], u[[i, j - 1]]),
                };
                let new = self.stencil.implicit_update(
                    west,
                    latest[[i + 1, j]],
                    south,
                    latest[[i, j + 1]],
                    self.explicit[[i, j]],
                );
                u[[i, j]] = omega * new + (1.0 - omega) * latest[[i, j]];
            }
        }
    }

    /// Whole-array sweep. SOR updates the four colour classes in turn, each pass seeing the
    /// results of the passes before it.
    fn sweep_vectorized(&mut self, u: &mut ArrayViewMut2<f64>) {
        let stencil = &self.stencil;
        let omega = self.config.omega;

        match self.config.iteration {
            Iteration::Jacobi => {
                update_nodes(
                    stencil,
                    &mut self.update,
                    self.latest.view(),
                    self.explicit.view(),
                    interior(),
                    interior(),
                );
            }
            Iteration::Sor => {
                self.update.assign(&self.latest);
                for &(first_i, first_j) in COLOUR_PASSES.iter() {
                    self.sweep.assign(&self.update);
                    update_nodes(
                        stencil,
                        &mut self.update,
                        self.sweep.view(),
                        self.explicit.view(),
                        colour(first_i),
                        colour(first_j),
                    );
                }
            }
        }

        Zip::from(u.slice_mut(s![1..-1, 1..-1]))
            .and(self.update.slice(s![1..-1, 1..-1]))
            .and(self.latest.slice(s![1..-1, 1..-1]))
            .for_each(|u, &new, &old| *u = omega * new + (1.0 - omega) * old);
    }
}

impl StepSolver for RelaxationSolver {
    fn name(&self) -> String {
        let version = match self.config.version {
            Version::Scalar => "scalar",
            Version::Vectorized => "vectorized",
        };
        let iteration = match self.config.iteration {
            Iteration::Jacobi => "Jacobi",
            Iteration::Sor => "SOR",
        };
        format!("{} {} (omega={})", version, iteration, self.config.omega)
    }

    fn step(
        &mut self,
        input: &StepInput,
        u_prev: ArrayView2<f64>,
        mut u: ArrayViewMut2<f64>,
    ) -> Result<StepReport> {
        match self.config.version {
            Version::Scalar => {
                explicit_part_nodewise(&self.stencil, u_prev, input.f_n, input.f_np1, &mut self.explicit)
            }
            Version::Vectorized => {
                explicit_part_sliced(&self.stencil, u_prev, input.f_n, input.f_np1, &mut self.explicit)
            }
        }

        self.latest.assign(&u_prev);
        let mut iterations = 0;

        let (max_change, stop) = loop {
            impose_boundary(u.view_mut(), input.boundary);
            match self.config.version {
                Version::Scalar => self.sweep_scalar(&mut u),
                Version::Vectorized => self.sweep_vectorized(&mut u),
            }
            iterations += 1;

            let max_change = max_abs_diff(u.view(), self.latest.view());
            self.latest.assign(&u);

            if max_change < self.config.tol {
                break (max_change, RelaxationStop::Converged);
            }
            if iterations >= self.config.max_iter {
                break (max_change, RelaxationStop::IterationCap);
            }
        };

        info!(
            "level {}: {} finished in {} iterations",
            input.level,
            self.name(),
            iterations
        );
        if stop == RelaxationStop::IterationCap {
            warn!(
                "level {}: iteration cap {} reached with max change {:.3e} (tol {:e})",
                input.level, self.config.max_iter, max_change, self.config.tol
            );
        }

        Ok(StepReport::Relaxation {
            iterations,
            max_change,
            stop,
        })
    }
}

use crate::error::{DiffusionError, Result};
use ndarray::prelude::*;

/// Upper limit on `Nt`, the number of time levels kept in memory
pub const MAX_STEPS: usize = 100_000_000;

/// Uniformly spaced points `start, start + h, ..., end`, with the final point pinned to `end`
fn uniform_points(start: f64, end: f64, n_intervals: usize) -> (Array1<f64>, f64) {
    let h = (end - start) / n_intervals as f64;
    let mut points = Array1::zeros(n_intervals + 1);

    for i in 0..=n_intervals {
        points[i] = start + i as f64 * h;
    }
    points[n_intervals] = end;

    (points, h)
}

/// Regular grid of `(nx + 1) x (ny + 1)` nodes over `[0, lx] x [0, ly]`
#[derive(Debug, Clone)]
pub struct Mesh2D {
    x: Array1<f64>,
    y: Array1<f64>,
    dx: f64,
    dy: f64,
    nx: usize,
    ny: usize,
}

impl Mesh2D {
    /// Create a mesh with `nx` cells in x and `ny` cells in y
    pub fn new_uniform(lx: f64, ly: f64, nx: usize, ny: usize) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(DiffusionError::invalid_mesh(format!(
                "Nx and Ny must be positive (got {}x{})",
                nx, ny
            )));
        }
        if !(lx > 0.0) || !(ly > 0.0) {
            return Err(DiffusionError::invalid_mesh(format!(
                "domain lengths must be positive (got {} x {})",
                lx, ly
            )));
        }

        let (x, dx) = uniform_points(0.0, lx, nx);
        let (y, dy) = uniform_points(0.0, ly, ny);

        Ok(Mesh2D { x, y, dx, dy, nx, ny })
    }

    /// Number of cells in x
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of cells in y
    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    /// Node coordinates in x
    pub fn x(&self) -> ArrayView1<f64> {
        self.x.view()
    }

    /// Node coordinates in y
    pub fn y(&self) -> ArrayView1<f64> {
        self.y.view()
    }

    /// Shape of a nodal field, indexed `[i, j]`
    pub fn shape(&self) -> (usize, usize) {
        (self.nx + 1, self.ny + 1)
    }

    /// Total number of nodes
    pub fn n_nodes(&self) -> usize {
        (self.nx + 1) * (self.ny + 1)
    }

    /// Allocate a zeroed nodal field
    pub fn zeros(&self) -> Array2<f64> {
        Array2::zeros(self.shape())
    }

    /// Is node `(i, j)` on the domain boundary?
    pub fn is_boundary(&self, i: usize, j: usize) -> bool {
        i == 0 || j == 0 || i == self.nx || j == self.ny
    }

    /// Sample `f(x, y)` at every node into `out`
    pub fn sample_into<F>(&self, out: &mut Array2<f64>, f: F)
    where
        F: Fn(f64, f64) -> f64,
    {
        for ((i, j), value) in out.indexed_iter_mut() {
            *value = f(self.x[i], self.y[j]);
        }
    }
}

/// The uniform time levels `t[0] = 0, ..., t[n_steps] = n_steps * dt`
#[derive(Debug, Clone)]
pub struct TimeMesh {
    t: Array1<f64>,
    dt: f64,
    n_steps: usize,
}

impl TimeMesh {
    /// The number of steps is `round(t_end / dt)`, so the final time is within `dt / 2` of `t_end`
    pub fn new(dt: f64, t_end: f64) -> Result<Self> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(DiffusionError::InvalidParameter {
                name: "dt",
                value: dt,
                reason: "time step must be positive and finite",
            });
        }
        if !(t_end > 0.0) || !t_end.is_finite() {
            return Err(DiffusionError::InvalidParameter {
                name: "t_end",
                value: t_end,
                reason: "final time must be positive and finite",
            });
        }

        let n_steps = (t_end / dt).round();
        if n_steps > MAX_STEPS as f64 {
            return Err(DiffusionError::InvalidParameter {
                name: "dt",
                value: dt,
                reason: "t_end / dt exceeds the limit on time steps",
            });
        }
        let n_steps = n_steps as usize;
        let t = if n_steps == 0 {
            Array1::zeros(1)
        } else {
            uniform_points(0.0, n_steps as f64 * dt, n_steps).0
        };

        Ok(TimeMesh { t, dt, n_steps })
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of time steps, `Nt`
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// All time levels, `Nt + 1` of them
    pub fn t(&self) -> ArrayView1<f64> {
        self.t.view()
    }

    /// Time at level `n`
    pub fn at(&self, n: usize) -> f64 {
        self.t[n]
    }
}

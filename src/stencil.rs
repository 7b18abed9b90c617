use crate::error::{DiffusionError, Result};
use crate::mesh::Mesh2D;
use ndarray::prelude::*;

pub mod second_order {
    /// Undivided second difference, `u[i-1] - 2u[i] + u[i+1]`
    pub static CENTRAL_2: [(isize, f64); 3] = [(-1, 1.0), (0, -2.0), (1, 1.0)];
}

pub fn apply<F>(stencil: &[(isize, f64)], i: usize, f: F) -> f64
where
    F: Fn(usize) -> f64,
{
    stencil.iter().fold(0.0, |acc, (k, w)| {
        let offset = (i as isize + k) as usize;
        acc + w * f(offset)
    })
}

/// Dimensionless diffusion numbers `Fx = a dt / dx^2`, `Fy = a dt / dy^2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourierNumbers {
    pub fx: f64,
    pub fy: f64,
}

impl FourierNumbers {
    pub fn new(a: f64, dt: f64, mesh: &Mesh2D) -> Self {
        FourierNumbers {
            fx: a * dt / mesh.dx().powi(2),
            fy: a * dt / mesh.dy().powi(2),
        }
    }
}

/// Five-point stencil weights of the theta-rule. `theta = 0` is Forward Euler, `theta = 1`
/// Backward Euler and `theta = 0.5` Crank-Nicolson.
#[derive(Debug, Clone, Copy)]
pub struct ThetaStencil {
    theta: f64,
    dt: f64,
    fourier: FourierNumbers,
}

impl ThetaStencil {
    pub fn new(theta: f64, dt: f64, fourier: FourierNumbers) -> Result<Self> {
        if !(0.0..=1.0).contains(&theta) {
            return Err(DiffusionError::InvalidParameter {
                name: "theta",
                value: theta,
                reason: "must lie in [0, 1]",
            });
        }
        Ok(ThetaStencil { theta, dt, fourier })
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn fourier(&self) -> FourierNumbers {
        self.fourier
    }

    /// Diagonal entry of an interior row, `1 + 2 theta (Fx + Fy)`
    pub fn centre(&self) -> f64 {
        1.0 + 2.0 * self.theta * (self.fourier.fx + self.fourier.fy)
    }

    /// Coupling to the `(i +- 1, j)` neighbours, `-theta Fx`
    pub fn west_east(&self) -> f64 {
        -self.theta * self.fourier.fx
    }

    /// Coupling to the `(i, j +- 1)` neighbours, `-theta Fy`
    pub fn south_north(&self) -> f64 {
        -self.theta * self.fourier.fy
    }

    /// `Fx d2u/dx2 + Fy d2u/dy2` at an interior node, undivided
    #[inline]
    pub fn laplacian(&self, u: ArrayView2<f64>, i: usize, j: usize) -> f64 {
        let FourierNumbers { fx, fy } = self.fourier;
        fx * apply(&second_order::CENTRAL_2, i, |ii| u[[ii, j]])
            + fy * apply(&second_order::CENTRAL_2, j, |jj| u[[i, jj]])
    }

    /// Everything in an interior equation that is known from the previous level:
    /// `u_prev + (1 - theta) L(u_prev) + theta dt f(t_{n+1}) + (1 - theta) dt f(t_n)`
    #[inline]
    pub fn explicit_part(
        &self,
        u_prev: ArrayView2<f64>,
        i: usize,
        j: usize,
        f_n: f64,
        f_np1: f64,
    ) -> f64 {
        u_prev[[i, j]]
            + (1.0 - self.theta) * self.laplacian(u_prev, i, j)
            + self.theta * self.dt * f_np1
            + (1.0 - self.theta) * self.dt * f_n
    }

    /// Solve an interior equation for its centre value, given the four neighbours at the new level
    #[inline]
    pub fn implicit_update(&self, west: f64, east: f64, south: f64, north: f64, explicit: f64) -> f64 {
        let FourierNumbers { fx, fy } = self.fourier;
        (self.theta * (fx * (east + west) + fy * (north + south)) + explicit) / self.centre()
    }

    /// Discrete amplification over `n` steps of the Fourier mode with half phase angles
    /// `px = kx dx / 2` and `py = ky dy / 2`
    pub fn amplification_factor(&self, px: f64, py: f64, n: usize) -> f64 {
        let FourierNumbers { fx, fy } = self.fourier;
        let s = 4.0 * (fx * px.sin().powi(2) + fy * py.sin().powi(2));
        let per_step = (1.0 - (1.0 - self.theta) * s) / (1.0 + self.theta * s);
        match i32::try_from(n) {
            Ok(n) => per_step.powi(n),
            Err(_) => per_step.powf(n as f64),
        }
    }
}

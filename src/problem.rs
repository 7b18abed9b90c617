use crate::dof_handler::DofHandler;
use crate::error::{DiffusionError, Result};
use crate::mesh::{Mesh2D, TimeMesh};
use crate::stencil::{FourierNumbers, ThetaStencil};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type InitialFn = Box<dyn Fn(f64, f64) -> f64>;
pub type SourceFn = Box<dyn Fn(f64, f64, f64) -> f64>;
pub type TimeFn = Box<dyn Fn(f64) -> f64>;

/// Physical and numerical parameters of a run
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Parameters {
    /// Domain length in x
    pub lx: f64,
    /// Domain length in y
    pub ly: f64,
    /// Cells in x
    pub nx: usize,
    /// Cells in y
    pub ny: usize,
    /// Time step
    pub dt: f64,
    /// Final time
    pub t_end: f64,
    /// Diffusion coefficient `a`
    pub diffusivity: f64,
    /// Implicitness of the theta-rule
    pub theta: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            lx: 2.0,
            ly: 1.0,
            nx: 10,
            ny: 10,
            dt: 0.05,
            t_end: 0.5,
            diffusivity: 1.5,
            theta: 0.5,
        }
    }
}

/// Dirichlet data on one edge of the domain
pub enum BoundaryValue {
    Constant(f64),
    Function(TimeFn),
}

impl BoundaryValue {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + 'static,
    {
        BoundaryValue::Function(Box::new(f))
    }

    /// Turn either variant into a plain function of time
    fn resolve(&self) -> Box<dyn Fn(f64) -> f64 + '_> {
        match self {
            BoundaryValue::Constant(value) => {
                let value = *value;
                Box::new(move |_t| value)
            }
            BoundaryValue::Function(f) => Box::new(move |t| f(t)),
        }
    }
}

impl Default for BoundaryValue {
    fn default() -> Self {
        BoundaryValue::Constant(0.0)
    }
}

impl From<f64> for BoundaryValue {
    fn from(value: f64) -> Self {
        BoundaryValue::Constant(value)
    }
}

/// Minimal impl of Debug so we can derive Debug on the other types
/// Cannot derive Debug on Fn
impl fmt::Debug for BoundaryValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BoundaryValue::Constant(value) => write!(f, "Constant({})", value),
            BoundaryValue::Function(_) => write!(f, "Function(..)"),
        }
    }
}

/// Dirichlet data on all four edges. Defaults to homogeneous conditions.
#[derive(Debug, Default)]
pub struct Boundaries {
    /// `x = 0`
    pub left: BoundaryValue,
    /// `x = lx`
    pub right: BoundaryValue,
    /// `y = 0`
    pub bottom: BoundaryValue,
    /// `y = ly`
    pub top: BoundaryValue,
}

/// The four boundary values at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeValues {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

/// A complete problem: parameters, initial condition, source term and boundary data
pub struct DiffusionProblem {
    pub p: Parameters,
    initial: InitialFn,
    source: Option<SourceFn>,
    pub boundaries: Boundaries,
}

impl DiffusionProblem {
    /// Problem with no source term and homogeneous Dirichlet conditions
    pub fn new<I>(p: Parameters, initial: I) -> Self
    where
        I: Fn(f64, f64) -> f64 + 'static,
    {
        DiffusionProblem {
            p,
            initial: Box::new(initial),
            source: None,
            boundaries: Boundaries::default(),
        }
    }

    pub fn with_source<F>(mut self, source: F) -> Self
    where
        F: Fn(f64, f64, f64) -> f64 + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_boundaries(mut self, boundaries: Boundaries) -> Self {
        self.boundaries = boundaries;
        self
    }

    /// Validate the parameters and build everything that stays fixed during a run
    pub fn discretize(&self) -> Result<Discretization<'_>> {
        let p = &self.p;

        if !(p.diffusivity >= 0.0) || !p.diffusivity.is_finite() {
            return Err(DiffusionError::InvalidParameter {
                name: "diffusivity",
                value: p.diffusivity,
                reason: "must be non-negative and finite",
            });
        }

        let mesh = Mesh2D::new_uniform(p.lx, p.ly, p.nx, p.ny)?;
        let time = TimeMesh::new(p.dt, p.t_end)?;
        let fourier = FourierNumbers::new(p.diffusivity, time.dt(), &mesh);
        let stencil = ThetaStencil::new(p.theta, time.dt(), fourier)?;
        let dofs = DofHandler::new(&mesh);

        let source: Box<dyn Fn(f64, f64, f64) -> f64 + '_> = match &self.source {
            Some(f) => Box::new(move |x, y, t| f(x, y, t)),
            None => Box::new(|_x, _y, _t| 0.0),
        };

        Ok(Discretization {
            mesh,
            time,
            stencil,
            dofs,
            initial: &*self.initial,
            source,
            left: self.boundaries.left.resolve(),
            right: self.boundaries.right.resolve(),
            bottom: self.boundaries.bottom.resolve(),
            top: self.boundaries.top.resolve(),
        })
    }
}

impl fmt::Debug for DiffusionProblem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DiffusionProblem")
            .field("p", &self.p)
            .field("source", &self.source.as_ref().map(|_| ".."))
            .field("boundaries", &self.boundaries)
            .finish()
    }
}

/// The resolved, read-only state shared by every strategy: meshes, stencil weights, index
/// mapping and uniform callables for the initial, source and boundary data
pub struct Discretization<'a> {
    pub mesh: Mesh2D,
    pub time: TimeMesh,
    pub stencil: ThetaStencil,
    pub dofs: DofHandler,
    initial: &'a dyn Fn(f64, f64) -> f64,
    source: Box<dyn Fn(f64, f64, f64) -> f64 + 'a>,
    left: Box<dyn Fn(f64) -> f64 + 'a>,
    right: Box<dyn Fn(f64) -> f64 + 'a>,
    bottom: Box<dyn Fn(f64) -> f64 + 'a>,
    top: Box<dyn Fn(f64) -> f64 + 'a>,
}

impl<'a> Discretization<'a> {
    /// Load the initial condition into `field`
    pub fn initial_field(&self, field: &mut Array2<f64>) {
        self.mesh.sample_into(field, |x, y| (self.initial)(x, y));
    }

    /// Sample the source term at time `t` into `out`
    pub fn sample_source(&self, t: f64, out: &mut Array2<f64>) {
        self.mesh.sample_into(out, |x, y| (self.source)(x, y, t));
    }

    /// Evaluate the boundary functions at time `t`
    pub fn boundary_values(&self, t: f64) -> EdgeValues {
        EdgeValues {
            left: (self.left)(t),
            right: (self.right)(t),
            bottom: (self.bottom)(t),
            top: (self.top)(t),
        }
    }
}

impl<'a> fmt::Debug for Discretization<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Discretization")
            .field("mesh", &self.mesh)
            .field("time", &self.time)
            .field("stencil", &self.stencil)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params() -> Parameters {
        Parameters {
            lx: 1.0,
            ly: 1.0,
            nx: 2,
            ny: 2,
            dt: 0.1,
            t_end: 0.3,
            diffusivity: 1.0,
            theta: 1.0,
        }
    }

    #[test]
    fn constants_become_functions_of_time() {
        let problem = DiffusionProblem::new(params(), |_, _| 0.0).with_boundaries(Boundaries {
            left: 1.5.into(),
            right: BoundaryValue::function(|t| 2.0 * t),
            ..Default::default()
        });
        let disc = problem.discretize().unwrap();

        let values = disc.boundary_values(0.25);
        assert_eq!(values.left, 1.5);
        assert_abs_diff_eq!(values.right, 0.5);
        assert_eq!(values.bottom, 0.0);
        assert_eq!(values.top, 0.0);

        assert_eq!(disc.boundary_values(7.0).left, 1.5);
    }

    #[test]
    fn missing_source_is_zero() {
        let problem = DiffusionProblem::new(params(), |x, y| x + y);
        let disc = problem.discretize().unwrap();
        let mut f = Array2::from_elem(disc.mesh.shape(), 3.0);
        disc.sample_source(0.1, &mut f);
        assert!(f.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn source_and_initial_sampled_at_nodes() {
        let problem = DiffusionProblem::new(params(), |x, y| x * y).with_source(|x, y, t| x + y + t);
        let disc = problem.discretize().unwrap();

        let mut field = disc.mesh.zeros();
        disc.initial_field(&mut field);
        assert_abs_diff_eq!(field[[1, 2]], 0.5);

        disc.sample_source(0.2, &mut field);
        assert_abs_diff_eq!(field[[2, 1]], 1.7);
    }

    #[test]
    fn invalid_parameters() {
        let mut p = params();
        p.diffusivity = -1.0;
        assert!(matches!(
            DiffusionProblem::new(p, |_, _| 0.0).discretize(),
            Err(DiffusionError::InvalidParameter { name: "diffusivity", .. })
        ));

        let mut p = params();
        p.nx = 0;
        assert!(matches!(
            DiffusionProblem::new(p, |_, _| 0.0).discretize(),
            Err(DiffusionError::InvalidMesh { .. })
        ));

        let mut p = params();
        p.theta = 2.0;
        assert!(DiffusionProblem::new(p, |_, _| 0.0).discretize().is_err());
    }

    #[test]
    fn parameters_json() {
        let p = Parameters::default();
        let json = serde_json::to_string(&p).unwrap();
        let back: Parameters = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}

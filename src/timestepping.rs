//! The time loop shared by every strategy, and the public entry points.
use crate::config::SolverConfig;
use crate::error::Result;
use crate::problem::{Discretization, DiffusionProblem};
use crate::solvers::{
    DenseSolver, RelaxationConfig, RelaxationSolver, SparseMethod, SparseSolver, StepInput,
    StepReport, StepSolver,
};
use log::{debug, info, warn};
use ndarray::prelude::*;
use std::io::Write;
use std::time::{Duration, Instant};

/// What the per-step callback sees. `field` must be treated as read-only; it becomes the
/// previous level of the next step.
#[derive(Debug)]
pub struct StepView<'a> {
    pub field: ArrayView2<'a, f64>,
    pub x: ArrayView1<'a, f64>,
    pub y: ArrayView1<'a, f64>,
    pub t: ArrayView1<'a, f64>,
    /// Level of `field`, from 0 (the initial condition) to `Nt`
    pub n: usize,
    /// Diagnostics of the solve that produced `field`; `None` at level 0
    pub report: Option<&'a StepReport>,
}

impl<'a> StepView<'a> {
    pub fn time(&self) -> f64 {
        self.t[self.n]
    }

    /// Write the field as whitespace separated `t x y u` columns, adding `u_exact` when an
    /// exact solution `(x, y, t) -> u` is given
    pub fn output<W: Write>(
        &self,
        mut buffer: W,
        exact: Option<&dyn Fn(f64, f64, f64) -> f64>,
    ) -> std::io::Result<()> {
        let time = self.time();

        match exact {
            Some(_) => buffer.write_all(b"t x y u u_exact\n")?,
            None => buffer.write_all(b"t x y u\n")?,
        }

        for ((i, j), &u) in self.field.indexed_iter() {
            let (x, y) = (self.x[i], self.y[j]);
            match exact {
                Some(exact) => writeln!(
                    buffer,
                    "{:.6e} {:.6e} {:.6e} {:.6e} {:.6e}",
                    time,
                    x,
                    y,
                    u,
                    exact(x, y, time)
                )?,
                None => writeln!(buffer, "{:.6e} {:.6e} {:.6e} {:.6e}", time, x, y, u)?,
            }
        }

        buffer.flush()
    }
}

/// Result of a completed run. The fields themselves are only ever handed to the callback.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The time levels, `Nt + 1` of them
    pub t: Array1<f64>,
    /// Wall-clock time spent in the run, callbacks included
    pub elapsed: Duration,
    /// One report per step
    pub reports: Vec<StepReport>,
}

impl RunSummary {
    /// Steps whose iterative solve stopped short of its tolerance
    pub fn n_unconverged(&self) -> usize {
        self.reports.iter().filter(|r| !r.converged()).count()
    }

    /// Total iterations over all steps
    pub fn total_iterations(&self) -> usize {
        self.reports.iter().map(|r| r.iterations()).sum()
    }
}

/// Drive `solver` through every time level of `disc`. `on_step` is called with the initial
/// condition and then with each new level before the buffers are swapped. An error from
/// `on_step` or from the solver ends the run.
pub fn run<S, F>(disc: &Discretization, solver: &mut S, mut on_step: F) -> Result<RunSummary>
where
    S: StepSolver + ?Sized,
    F: FnMut(&StepView) -> Result<()>,
{
    let start = Instant::now();
    let n_steps = disc.time.n_steps();
    let t = disc.time.t();
    let (x, y) = (disc.mesh.x(), disc.mesh.y());

    info!(
        "{} solver: {}x{} cells, {} steps of dt = {}, theta = {}",
        solver.name(),
        disc.mesh.nx(),
        disc.mesh.ny(),
        n_steps,
        disc.time.dt(),
        disc.stencil.theta()
    );

    let mut u_prev = disc.mesh.zeros();
    let mut u = disc.mesh.zeros();
    let mut f_n = disc.mesh.zeros();
    let mut f_np1 = disc.mesh.zeros();

    disc.initial_field(&mut u_prev);
    on_step(&StepView {
        field: u_prev.view(),
        x: x.view(),
        y: y.view(),
        t: t.view(),
        n: 0,
        report: None,
    })?;

    disc.sample_source(t[0], &mut f_n);
    let mut reports = Vec::with_capacity(n_steps);

    for n in 0..n_steps {
        let t_np1 = t[n + 1];
        disc.sample_source(t_np1, &mut f_np1);

        let input = StepInput {
            level: n + 1,
            boundary: disc.boundary_values(t_np1),
            f_n: f_n.view(),
            f_np1: f_np1.view(),
        };
        let report = solver.step(&input, u_prev.view(), u.view_mut())?;
        debug!("t={:.4}: {}", t_np1, report);

        on_step(&StepView {
            field: u.view(),
            x: x.view(),
            y: y.view(),
            t: t.view(),
            n: n + 1,
            report: Some(&report),
        })?;
        reports.push(report);

        std::mem::swap(&mut u_prev, &mut u);
        std::mem::swap(&mut f_n, &mut f_np1);
    }

    let summary = RunSummary {
        t: t.to_owned(),
        elapsed: start.elapsed(),
        reports,
    };

    info!(
        "{} solver finished {} steps in {:.3?}",
        solver.name(),
        n_steps,
        summary.elapsed
    );
    let unconverged = summary.n_unconverged();
    if unconverged > 0 {
        warn!("{} of {} steps stopped short of their tolerance", unconverged, n_steps);
    }

    Ok(summary)
}

/// Solve with a dense LU factorization of the full operator
pub fn solve_dense<F>(problem: &DiffusionProblem, on_step: F) -> Result<RunSummary>
where
    F: FnMut(&StepView) -> Result<()>,
{
    let disc = problem.discretize()?;
    let mut solver = DenseSolver::new(&disc)?;
    run(&disc, &mut solver, on_step)
}

/// Solve with the five-diagonal sparse operator, directly or by preconditioned CG
pub fn solve_sparse<F>(problem: &DiffusionProblem, method: SparseMethod, on_step: F) -> Result<RunSummary>
where
    F: FnMut(&StepView) -> Result<()>,
{
    let disc = problem.discretize()?;
    let mut solver = SparseSolver::new(&disc, method)?;
    run(&disc, &mut solver, on_step)
}

/// Solve by Jacobi or SOR iteration on the stencil
pub fn solve_relaxation<F>(
    problem: &DiffusionProblem,
    config: RelaxationConfig,
    on_step: F,
) -> Result<RunSummary>
where
    F: FnMut(&StepView) -> Result<()>,
{
    let disc = problem.discretize()?;
    let mut solver = RelaxationSolver::new(&disc, config)?;
    run(&disc, &mut solver, on_step)
}

/// Solve with whichever strategy `config` names
pub fn solve<F>(problem: &DiffusionProblem, config: &SolverConfig, on_step: F) -> Result<RunSummary>
where
    F: FnMut(&StepView) -> Result<()>,
{
    match *config {
        SolverConfig::Dense => solve_dense(problem, on_step),
        SolverConfig::Sparse { method } => solve_sparse(problem, method, on_step),
        SolverConfig::Relaxation(relaxation) => solve_relaxation(problem, relaxation, on_step),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiffusionError;
    use crate::problem::{BoundaryValue, Boundaries, Parameters};
    use crate::solvers::{Iteration, Version};
    use crate::utilities::max_abs_diff;
    use approx::assert_abs_diff_eq;

    fn noop(_: &StepView) -> Result<()> {
        Ok(())
    }

    fn params() -> Parameters {
        Parameters {
            lx: 1.0,
            ly: 2.0,
            nx: 4,
            ny: 6,
            dt: 0.1,
            t_end: 0.5,
            diffusivity: 0.7,
            theta: 0.5,
        }
    }

    #[test]
    fn callback_sees_every_level_in_order() {
        let problem = DiffusionProblem::new(params(), |x, y| x + y);
        let mut levels = Vec::new();
        let summary = solve_dense(&problem, |view| {
            assert_eq!(view.report.is_none(), view.n == 0);
            assert_eq!(view.field.dim(), (5, 7));
            levels.push((view.n, view.time()));
            Ok(())
        })
        .unwrap();

        assert_eq!(levels.len(), 6);
        for (k, &(n, t)) in levels.iter().enumerate() {
            assert_eq!(n, k);
            assert_abs_diff_eq!(t, 0.1 * k as f64, epsilon = 1e-14);
        }
        assert_eq!(summary.t.len(), 6);
        assert_eq!(summary.reports.len(), 5);
        assert_eq!(summary.total_iterations(), 0);
        assert_eq!(summary.n_unconverged(), 0);
    }

    #[test]
    fn initial_condition_passed_first() {
        let problem = DiffusionProblem::new(params(), |x, y| 3.0 * x - y);
        solve_sparse(&problem, SparseMethod::Direct, |view| {
            if view.n == 0 {
                assert_abs_diff_eq!(view.field[[2, 3]], 3.0 * 0.5 - 1.0, epsilon = 1e-14);
            }
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn time_arrays_identical_across_strategies() {
        let problem = DiffusionProblem::new(params(), |_, _| 1.0);
        let dense = solve_dense(&problem, noop).unwrap();
        let sparse = solve_sparse(&problem, SparseMethod::Cg { tol: 1e-8 }, noop).unwrap();
        let relaxation = solve_relaxation(&problem, RelaxationConfig::default(), noop).unwrap();
        assert_eq!(dense.t, sparse.t);
        assert_eq!(dense.t, relaxation.t);
    }

    #[test]
    fn time_dependent_boundaries_hold_exactly() {
        let problem = DiffusionProblem::new(params(), |_, _| 0.0)
            .with_source(|x, y, t| x * y + t)
            .with_boundaries(Boundaries {
                left: BoundaryValue::function(|t| 1.0 + t),
                right: 0.25.into(),
                bottom: BoundaryValue::function(|t| -t),
                top: BoundaryValue::function(|t| t * t),
            });

        let mut configs = vec![
            SolverConfig::Dense,
            SolverConfig::Sparse {
                method: SparseMethod::Direct,
            },
            SolverConfig::Sparse {
                method: SparseMethod::Cg { tol: 1e-12 },
            },
        ];
        for &version in &[Version::Scalar, Version::Vectorized] {
            for &iteration in &[Iteration::Jacobi, Iteration::Sor] {
                configs.push(SolverConfig::Relaxation(RelaxationConfig {
                    version,
                    iteration,
                    tol: 1e-12,
                    max_iter: 1000,
                    ..Default::default()
                }));
            }
        }

        let mut reference: Vec<Array2<f64>> = Vec::new();
        for config in &configs {
            let mut fields = Vec::new();
            solve(&problem, config, |view| {
                fields.push(view.field.to_owned());
                if view.n == 0 {
                    return Ok(());
                }
                let t = view.time();
                let u = &view.field;
                for j in 1..6 {
                    assert_eq!(u[[0, j]], 1.0 + t, "{:?}", config);
                    assert_eq!(u[[4, j]], 0.25, "{:?}", config);
                }
                for i in 0..5 {
                    assert_eq!(u[[i, 0]], -t, "{:?}", config);
                    assert_eq!(u[[i, 6]], t * t, "{:?}", config);
                }
                Ok(())
            })
            .unwrap();

            if reference.is_empty() {
                reference = fields;
                continue;
            }
            assert_eq!(fields.len(), reference.len());
            for (field, expected) in fields.iter().zip(&reference) {
                assert!(
                    max_abs_diff(field.view(), expected.view()) < 1e-9,
                    "{:?}",
                    config
                );
            }
        }
    }

    #[test]
    fn callback_errors_stop_the_run() {
        let problem = DiffusionProblem::new(params(), |_, _| 0.0);
        let mut calls = 0;
        let result = solve_dense(&problem, |view| {
            calls += 1;
            if view.n == 2 {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(DiffusionError::Io(_))));
        assert_eq!(calls, 3);
    }

    #[test]
    fn invalid_problems_fail_before_stepping() {
        let mut p = params();
        p.nx = 0;
        let problem = DiffusionProblem::new(p, |_, _| 0.0);
        let mut called = false;
        let result = solve_dense(&problem, |_| {
            called = true;
            Ok(())
        });
        assert!(matches!(result, Err(DiffusionError::InvalidMesh { .. })));
        assert!(!called);
    }

    #[test]
    fn output_format() {
        let x = array![0.0, 1.0];
        let y = array![0.0, 2.0];
        let t = array![0.0, 0.5];
        let field = array![[1.0, 2.0], [3.0, 4.0]];
        let view = StepView {
            field: field.view(),
            x: x.view(),
            y: y.view(),
            t: t.view(),
            n: 1,
            report: None,
        };

        let mut buffer = Vec::new();
        view.output(&mut buffer, Some(&|x, y, _t| x * y)).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "t x y u u_exact");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4], "5.000000e-1 1.000000e0 2.000000e0 4.000000e0 2.000000e0");
    }
}

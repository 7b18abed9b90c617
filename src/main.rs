use diffu2d::config::RunConfig;
use diffu2d::problem::{DiffusionProblem, Parameters};
use diffu2d::timestepping::{solve, StepView};
use diffu2d::utilities::{init_logging, max_abs};

use log::info;
use rand::Rng;
use std::f64::consts::PI;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
type ExactFn = Box<dyn Fn(f64, f64, f64) -> f64>;

#[derive(StructOpt, Debug)]
#[structopt(name = "diffu2d")]
struct Opt {
    /// JSON run configuration; the defaults are used when absent
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Test case
    #[structopt(long, default_value = "sine", possible_values = &["sine", "quadratic"])]
    case: String,

    /// Size of the random perturbation added to the interior of the initial condition
    #[structopt(long, default_value = "0.0")]
    perturbation: f64,

    /// Output interval (in timesteps)
    #[structopt(long, default_value = "1")]
    output_interval: usize,

    /// Output directory
    #[structopt(long, default_value = "res")]
    dir: String,
}

/// Decaying lowest mode `exp(-a pi^2 (1/lx^2 + 1/ly^2) t) sin(pi x / lx) sin(pi y / ly)`
fn sine_case(p: &Parameters, perturbation: f64) -> (DiffusionProblem, ExactFn) {
    let (lx, ly, a) = (p.lx, p.ly, p.diffusivity);
    let exact = move |x: f64, y: f64, t: f64| {
        (-a * PI.powi(2) * (lx.powi(-2) + ly.powi(-2)) * t).exp()
            * (PI * x / lx).sin()
            * (PI * y / ly).sin()
    };

    let problem = DiffusionProblem::new(p.clone(), move |x, y| {
        let interior = x > 0.0 && x < lx && y > 0.0 && y < ly;
        if interior && perturbation > 0.0 {
            exact(x, y, 0.0) + rand::thread_rng().gen_range(-perturbation..=perturbation)
        } else {
            exact(x, y, 0.0)
        }
    });

    (problem, Box::new(exact))
}

/// `u = 5 t x (lx - x) y (ly - y)`, which every strategy reproduces to rounding
fn quadratic_case(p: &Parameters) -> (DiffusionProblem, ExactFn) {
    let (lx, ly, a) = (p.lx, p.ly, p.diffusivity);
    let exact = move |x: f64, y: f64, t: f64| 5.0 * t * x * (lx - x) * y * (ly - y);

    let problem = DiffusionProblem::new(p.clone(), |_, _| 0.0).with_source(move |x, y, t| {
        5.0 * x * (lx - x) * y * (ly - y) + 10.0 * a * t * (y * (ly - y) + x * (lx - x))
    });

    (problem, Box::new(exact))
}

/// Compare the computed peak with the exact decay and the decay the scheme should produce
fn examine_sine(view: &StepView, p: &Parameters, amplification: impl Fn(usize) -> f64) {
    let t = view.time();
    let exact_peak = (-p.diffusivity * PI.powi(2) * (p.lx.powi(-2) + p.ly.powi(-2)) * t).exp();
    let max_u = max_abs(view.field);

    // The mesh may not contain the sine peak, so compare against the sampled maximum
    let mut sampled_peak = 0.0f64;
    for &x in view.x {
        for &y in view.y {
            sampled_peak = sampled_peak.max(exact_peak * (PI * x / p.lx).sin() * (PI * y / p.ly).sin());
        }
    }

    let u_diff = (sampled_peak - max_u).abs();
    let a_diff = (exact_peak - amplification(view.n)).abs();

    info!(
        "t={:.3} max u: {:.2e}, error in u: {:.2e}, ampl.: {:.2e}, iter: {:.2e}",
        t,
        max_u,
        u_diff,
        a_diff,
        (u_diff - a_diff).abs()
    );
}

fn main() -> Result<()> {
    init_logging();
    let opt = Opt::from_args();

    let config = match &opt.config {
        Some(path) => RunConfig::from_json_file(path)?,
        None => RunConfig::default(),
    };
    info!("{:?}", config);

    let p = &config.parameters;
    let (problem, exact) = match opt.case.as_ref() {
        "quadratic" => quadratic_case(p),
        _ => sine_case(p, opt.perturbation),
    };

    let disc = problem.discretize()?;
    let stencil = disc.stencil;
    let (px, py) = (
        PI * disc.mesh.dx() / (2.0 * p.lx),
        PI * disc.mesh.dy() / (2.0 * p.ly),
    );

    let dir_path = Path::new(&opt.dir);
    fs::create_dir_all(dir_path)?;
    let output_interval = opt.output_interval.max(1);
    let is_sine = opt.case != "quadratic";

    let summary = solve(&problem, &config.solver, |view| {
        if is_sine {
            examine_sine(view, p, |n| stencil.amplification_factor(px, py, n));
        }

        if view.n % output_interval == 0 {
            let file = fs::File::create(
                dir_path.join(format!("output_{:05}.csv", view.n / output_interval)),
            )?;
            view.output(BufWriter::new(file), Some(&*exact))?;
        }
        Ok(())
    })?;

    info!(
        "{} steps, {} iterations in total, {} unconverged, {:.3?}",
        summary.reports.len(),
        summary.total_iterations(),
        summary.n_unconverged(),
        summary.elapsed
    );

    Ok(())
}

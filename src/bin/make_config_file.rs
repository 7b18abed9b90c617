use diffu2d::config::{RunConfig, SolverConfig};
use diffu2d::solvers::{Iteration, RelaxationConfig, SparseMethod, Version};
use diffu2d::utilities::dump_default_to_json_file;

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "make_config_file")]
struct Opt {
    /// Where to write the configuration
    #[structopt(long, default_value = "config.json")]
    output: String,

    /// Strategy to write settings for; the default configuration is written when absent
    #[structopt(
        long,
        possible_values = &["dense", "sparse", "cg", "jacobi", "sor", "scalar_jacobi", "scalar_sor"]
    )]
    strategy: Option<String>,
}

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn relaxation(version: Version, iteration: Iteration) -> SolverConfig {
    SolverConfig::Relaxation(RelaxationConfig {
        version,
        iteration,
        ..Default::default()
    })
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let solver = match opt.strategy.as_deref() {
        None => return dump_default_to_json_file::<RunConfig>(&opt.output),
        Some("sparse") => SolverConfig::Sparse {
            method: SparseMethod::Direct,
        },
        Some("cg") => SolverConfig::Sparse {
            method: SparseMethod::Cg { tol: 1e-5 },
        },
        Some("jacobi") => relaxation(Version::Vectorized, Iteration::Jacobi),
        Some("sor") => relaxation(Version::Vectorized, Iteration::Sor),
        Some("scalar_jacobi") => relaxation(Version::Scalar, Iteration::Jacobi),
        Some("scalar_sor") => relaxation(Version::Scalar, Iteration::Sor),
        Some(_) => SolverConfig::Dense,
    };

    let config = RunConfig {
        solver,
        ..Default::default()
    };
    config.to_json_file(&opt.output)?;

    Ok(())
}

use ndarray::prelude::*;
use ndarray::Zip;
use serde::Serialize;
use std::fs;
use std::io::BufWriter;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Largest absolute entrywise difference, `max |a - b|`
pub fn max_abs_diff(a: ArrayView2<f64>, b: ArrayView2<f64>) -> f64 {
    Zip::from(a)
        .and(b)
        .fold(0.0, |acc: f64, &x, &y| acc.max((x - y).abs()))
}

/// Largest absolute value in `a`
pub fn max_abs(a: ArrayView2<f64>) -> f64 {
    a.fold(0.0, |acc: f64, &x| acc.max(x.abs()))
}

/// Write `T::default()` as pretty JSON, a starting point for hand-edited config files
pub fn dump_default_to_json_file<T>(filename: &str) -> Result<()>
where
    T: Default + Serialize,
{
    let writer = BufWriter::new(fs::File::create(filename)?);
    serde_json::to_writer_pretty(writer, &T::default())?;
    Ok(())
}

/// Install `env_logger` for the binaries, at `info` unless `RUST_LOG` says otherwise
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    // a logger may already be installed when called twice in one process
    let _ = env_logger::Builder::from_env(env).try_init();
}

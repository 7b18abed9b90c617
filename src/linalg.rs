//! Sparse storage and solvers used by the sparse strategy. The direct solves go through
//! `faer` and `nalgebra`.
pub mod cg;
pub mod csr;
pub mod ilu;
pub mod sparse_lu;

pub use cg::{pcg, CgWorkspace, KrylovOutcome, KrylovStatus};
pub use csr::{CsrBuilder, CsrMatrix};
pub use ilu::Ilu0;
pub use sparse_lu::SparseLu;

#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn norm2(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// `y += alpha * x`
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn vector_ops() {
        let a = [1.0, 2.0, 2.0];
        let mut b = [0.5, -1.0, 4.0];
        assert_abs_diff_eq!(dot(&a, &b), 6.5);
        assert_abs_diff_eq!(norm2(&a), 3.0);

        axpy(2.0, &a, &mut b);
        assert_eq!(b, [2.5, 3.0, 8.0]);
    }
}

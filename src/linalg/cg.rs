use super::csr::CsrMatrix;
use super::ilu::Ilu0;
use super::{axpy, dot, norm2};

/// How a Krylov solve ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KrylovStatus {
    Converged,
    /// The iteration cap was reached before the tolerance
    NotConverged,
    /// `p^T A p` vanished, so the recurrence cannot continue
    Breakdown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KrylovOutcome {
    pub status: KrylovStatus,
    pub iterations: usize,
    /// Final residual norm relative to `|b|`
    pub residual: f64,
}

/// Work vectors for `pcg`, allocated once per run
#[derive(Debug, Clone)]
pub struct CgWorkspace {
    r: Vec<f64>,
    z: Vec<f64>,
    p: Vec<f64>,
    q: Vec<f64>,
}

impl CgWorkspace {
    pub fn new(n: usize) -> Self {
        CgWorkspace {
            r: vec![0.0; n],
            z: vec![0.0; n],
            p: vec![0.0; n],
            q: vec![0.0; n],
        }
    }
}

/// Preconditioned conjugate gradients on `A x = b`, starting from the value of `x` on entry.
/// Stops once `|b - A x| <= tol |b|` (with `|b|` taken as one for a zero right-hand side) or
/// after `max_iter` iterations.
pub fn pcg(
    a: &CsrMatrix,
    b: &[f64],
    x: &mut [f64],
    precond: &Ilu0,
    tol: f64,
    max_iter: usize,
    ws: &mut CgWorkspace,
) -> KrylovOutcome {
    let CgWorkspace { r, z, p, q } = ws;

    let b_norm = match norm2(b) {
        norm if norm == 0.0 => 1.0,
        norm => norm,
    };
    let threshold = tol * b_norm;

    // r = b - A x
    a.mul_vec(x, r);
    for (ri, bi) in r.iter_mut().zip(b) {
        *ri = bi - *ri;
    }

    let mut res_norm = norm2(r);
    if res_norm <= threshold {
        return KrylovOutcome {
            status: KrylovStatus::Converged,
            iterations: 0,
            residual: res_norm / b_norm,
        };
    }

    precond.apply(r, z);
    p.copy_from_slice(z);
    let mut rz = dot(r, z);

    for iter in 1..=max_iter {
        a.mul_vec(p, q);
        let pq = dot(p, q);
        if pq == 0.0 || !pq.is_finite() {
            return KrylovOutcome {
                status: KrylovStatus::Breakdown,
                iterations: iter - 1,
                residual: res_norm / b_norm,
            };
        }

        let alpha = rz / pq;
        axpy(alpha, p, x);
        axpy(-alpha, q, r);

        res_norm = norm2(r);
        log::trace!("pcg iteration {}: |r| = {:.3e}", iter, res_norm);
        if res_norm <= threshold {
            return KrylovOutcome {
                status: KrylovStatus::Converged,
                iterations: iter,
                residual: res_norm / b_norm,
            };
        }

        precond.apply(r, z);
        let rz_new = dot(r, z);
        let beta = rz_new / rz;
        rz = rz_new;

        for (pi, zi) in p.iter_mut().zip(z.iter()) {
            *pi = zi + beta * *pi;
        }
    }

    KrylovOutcome {
        status: KrylovStatus::NotConverged,
        iterations: max_iter,
        residual: res_norm / b_norm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::csr::CsrBuilder;
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    /// Five-point Laplacian plus identity on an `m x m` grid
    fn spd(m: usize) -> CsrMatrix {
        let n = m * m;
        let mut builder = CsrBuilder::new(n);
        for j in 0..m {
            for i in 0..m {
                let k = j * m + i;
                builder.set(k, k, 5.0);
                if i > 0 {
                    builder.set(k, k - 1, -1.0);
                }
                if i + 1 < m {
                    builder.set(k, k + 1, -1.0);
                }
                if j > 0 {
                    builder.set(k, k - m, -1.0);
                }
                if j + 1 < m {
                    builder.set(k, k + m, -1.0);
                }
            }
        }
        builder.build()
    }

    #[test]
    fn converges_to_solution() {
        let a = spd(6);
        let n = a.n_rows();
        let exact = Array1::random(n, Uniform::new(-1.0, 1.0));
        let mut b = vec![0.0; n];
        a.mul_vec(exact.as_slice().unwrap(), &mut b);

        let ilu = Ilu0::new(&a).unwrap();
        let mut ws = CgWorkspace::new(n);
        let mut x = vec![0.0; n];
        let outcome = pcg(&a, &b, &mut x, &ilu, 1e-12, n, &mut ws);

        assert_eq!(outcome.status, KrylovStatus::Converged);
        assert!(outcome.iterations <= n);
        assert!(outcome.residual <= 1e-12);
        for (xi, ei) in x.iter().zip(exact.iter()) {
            assert_abs_diff_eq!(xi, ei, epsilon = 1e-9);
        }
    }

    #[test]
    fn exact_start_needs_no_iterations() {
        let a = spd(3);
        let x_exact: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let mut b = vec![0.0; 9];
        a.mul_vec(&x_exact, &mut b);

        let mut x = x_exact.clone();
        let outcome = pcg(&a, &b, &mut x, &Ilu0::new(&a).unwrap(), 1e-8, 9, &mut CgWorkspace::new(9));
        assert_eq!(outcome.status, KrylovStatus::Converged);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(x, x_exact);
    }

    #[test]
    fn zero_rhs_uses_absolute_tolerance() {
        let a = spd(3);
        let mut x = vec![0.0; 9];
        let outcome = pcg(&a, &[0.0; 9], &mut x, &Ilu0::new(&a).unwrap(), 1e-8, 9, &mut CgWorkspace::new(9));
        assert_eq!(outcome.status, KrylovStatus::Converged);
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn iteration_cap_reported() {
        let a = spd(8);
        let n = a.n_rows();
        let b = vec![1.0; n];
        let mut x = vec![0.0; n];
        let outcome = pcg(&a, &b, &mut x, &Ilu0::new(&a).unwrap(), 1e-14, 1, &mut CgWorkspace::new(n));
        assert_eq!(outcome.status, KrylovStatus::NotConverged);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.residual > 1e-14);
    }
}

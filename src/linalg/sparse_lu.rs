use super::csr::CsrMatrix;
use crate::error::{DiffusionError, Result};
use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::Lu;
use faer::sparse::{SparseColMat, Triplet};
use faer::Col;
use log::debug;

/// Sparse LU factors of the operator, computed once with row pivoting and reused for every
/// right-hand side
pub struct SparseLu {
    lu: Lu<usize, f64>,
    rhs: Col<f64>,
}

impl SparseLu {
    /// Factorize `a`. A structurally or numerically singular matrix gives
    /// `DiffusionError::SingularSystem`.
    pub fn new(a: &CsrMatrix) -> Result<Self> {
        let n = a.n_rows();
        let mut triplets = Vec::with_capacity(a.nnz());
        for row in 0..n {
            let (cols, values) = a.row(row);
            for (&col, &val) in cols.iter().zip(values) {
                triplets.push(Triplet::new(row, col, val));
            }
        }

        let singular = |reason: String| {
            debug!("sparse LU failed: {}", reason);
            DiffusionError::SingularSystem { step: None }
        };

        let matrix = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &triplets)
            .map_err(|e| singular(format!("{:?}", e)))?;
        let lu = matrix.sp_lu().map_err(|e| singular(format!("{:?}", e)))?;

        Ok(SparseLu {
            lu,
            rhs: Col::zeros(n),
        })
    }

    /// Overwrite `x`, holding the right-hand side on entry, with the solution. Returns `false`
    /// when the solution is not finite.
    pub fn solve_in_place(&mut self, x: &mut [f64]) -> bool {
        for (i, &xi) in x.iter().enumerate() {
            self.rhs[i] = xi;
        }
        self.lu.solve_in_place(&mut self.rhs);

        let mut finite = true;
        for (i, xi) in x.iter_mut().enumerate() {
            *xi = self.rhs[i];
            finite &= xi.is_finite();
        }
        finite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::csr::CsrBuilder;
    use approx::assert_abs_diff_eq;
    use nalgebra::{DMatrix, DVector};
    use ndarray::Array1;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    /// Random nonsymmetric matrix with diagonals at `0, +-1, +-stride`, diagonally dominant
    fn banded(n: usize, stride: usize) -> CsrMatrix {
        let off = Array1::random(4 * n, Uniform::new(-1.0, 1.0));
        let mut builder = CsrBuilder::new(n);
        for i in 0..n {
            let mut row_sum = 0.0;
            for (s, &offset) in [1, stride].iter().enumerate() {
                if i >= offset {
                    builder.set(i, i - offset, off[4 * i + 2 * s]);
                    row_sum += off[4 * i + 2 * s].abs();
                }
                if i + offset < n {
                    builder.set(i, i + offset, off[4 * i + 2 * s + 1]);
                    row_sum += off[4 * i + 2 * s + 1].abs();
                }
            }
            builder.set(i, i, row_sum + 1.0);
        }
        builder.build()
    }

    fn to_dense(a: &CsrMatrix) -> DMatrix<f64> {
        DMatrix::from_fn(a.n_rows(), a.n_rows(), |i, j| a.get(i, j))
    }

    #[test]
    fn matches_dense_solve() {
        let a = banded(30, 6);
        let b = Array1::random(30, Uniform::new(-2.0, 2.0));

        let mut lu = SparseLu::new(&a).unwrap();
        let mut x = b.to_vec();
        assert!(lu.solve_in_place(&mut x));

        let expected = to_dense(&a)
            .lu()
            .solve(&DVector::from_column_slice(b.as_slice().unwrap()))
            .unwrap();

        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(xi, ei, epsilon = 1e-12);
        }
    }

    #[test]
    fn factors_are_reused() {
        let a = banded(17, 4);
        let mut lu = SparseLu::new(&a).unwrap();

        for shift in 0..3 {
            let b: Vec<f64> = (0..17).map(|i| (i as f64 + shift as f64).sin()).collect();
            let mut x = b.clone();
            assert!(lu.solve_in_place(&mut x));

            let mut ax = vec![0.0; 17];
            a.mul_vec(&x, &mut ax);
            for (l, r) in ax.iter().zip(&b) {
                assert_abs_diff_eq!(l, r, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn needs_row_exchange() {
        // zero diagonal, solvable only with pivoting
        let mut builder = CsrBuilder::new(2);
        builder.set(0, 1, 1.0);
        builder.set(1, 0, 2.0);
        let mut lu = SparseLu::new(&builder.build()).unwrap();

        let mut x = vec![3.0, 4.0];
        assert!(lu.solve_in_place(&mut x));
        assert_abs_diff_eq!(x[0], 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(x[1], 3.0, epsilon = 1e-14);
    }

    #[test]
    fn empty_row_is_singular() {
        let mut builder = CsrBuilder::new(2);
        builder.set(0, 0, 1.0);
        builder.set(0, 1, 1.0);
        assert!(matches!(
            SparseLu::new(&builder.build()),
            Err(DiffusionError::SingularSystem { step: None })
        ));
    }
}

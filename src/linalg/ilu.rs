use super::csr::CsrMatrix;
use crate::error::{DiffusionError, Result};

/// Incomplete LU factorization restricted to the sparsity pattern of the matrix. The strictly
/// lower part holds `L` (unit diagonal implied), the rest holds `U`.
#[derive(Debug, Clone)]
pub struct Ilu0 {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    lu: Vec<f64>,
    diag: Vec<usize>,
}

impl Ilu0 {
    /// Factorize `a`, whose diagonal must be fully stored. A zero pivot gives
    /// `DiffusionError::SingularSystem`.
    pub fn new(a: &CsrMatrix) -> Result<Self> {
        let n = a.n_rows();
        let row_ptr = a.row_ptr().to_vec();
        let col_idx = a.col_idx().to_vec();
        let mut lu = a.values().to_vec();

        let mut diag = Vec::with_capacity(n);
        for i in 0..n {
            let cols = &col_idx[row_ptr[i]..row_ptr[i + 1]];
            match cols.binary_search(&i) {
                Ok(local) => diag.push(row_ptr[i] + local),
                Err(_) => return Err(DiffusionError::SingularSystem { step: None }),
            }
        }

        // IKJ variant: eliminate row i with the already factorized rows k < i
        for i in 1..n {
            for kk in row_ptr[i]..diag[i] {
                let k = col_idx[kk];
                let pivot = lu[diag[k]];
                if pivot == 0.0 {
                    return Err(DiffusionError::SingularSystem { step: None });
                }
                lu[kk] /= pivot;
                let factor = lu[kk];

                for jj in (kk + 1)..row_ptr[i + 1] {
                    let j = col_idx[jj];
                    let row_k = &col_idx[diag[k] + 1..row_ptr[k + 1]];
                    if let Ok(local) = row_k.binary_search(&j) {
                        lu[jj] -= factor * lu[diag[k] + 1 + local];
                    }
                }
            }
        }

        if diag.iter().any(|&d| lu[d] == 0.0) {
            return Err(DiffusionError::SingularSystem { step: None });
        }

        Ok(Ilu0 {
            row_ptr,
            col_idx,
            lu,
            diag,
        })
    }

    /// `z = (LU)^{-1} r`
    pub fn apply(&self, r: &[f64], z: &mut [f64]) {
        let n = self.diag.len();
        z.copy_from_slice(r);

        for i in 0..n {
            let mut sum = z[i];
            for kk in self.row_ptr[i]..self.diag[i] {
                sum -= self.lu[kk] * z[self.col_idx[kk]];
            }
            z[i] = sum;
        }

        for i in (0..n).rev() {
            let mut sum = z[i];
            for kk in (self.diag[i] + 1)..self.row_ptr[i + 1] {
                sum -= self.lu[kk] * z[self.col_idx[kk]];
            }
            z[i] = sum / self.lu[self.diag[i]];
        }
    }
}

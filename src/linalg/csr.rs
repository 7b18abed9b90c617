use std::collections::BTreeMap;

/// Compressed sparse row matrix. Column indices within a row are sorted.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n_rows: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Column indices and values of row `row`
    pub fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    /// Entry `(row, col)`, zero if not stored
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (cols, values) = self.row(row);
        match cols.binary_search(&col) {
            Ok(idx) => values[idx],
            Err(_) => 0.0,
        }
    }

    /// `y = A x`
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.n_rows);
        debug_assert_eq!(y.len(), self.n_rows);

        for (row, yi) in y.iter_mut().enumerate() {
            let (cols, values) = self.row(row);
            *yi = cols.iter().zip(values).map(|(&c, v)| v * x[c]).sum();
        }
    }
}

/// Collects entries in any order and produces a `CsrMatrix`
#[derive(Debug, Clone)]
pub struct CsrBuilder {
    rows: Vec<BTreeMap<usize, f64>>,
}

impl CsrBuilder {
    /// Builder for an `n x n` matrix
    pub fn new(n: usize) -> Self {
        CsrBuilder {
            rows: vec![BTreeMap::new(); n],
        }
    }

    /// Set entry `(row, col)`. Zero values are not stored.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(col < self.rows.len());
        if value == 0.0 {
            self.rows[row].remove(&col);
        } else {
            self.rows[row].insert(col, value);
        }
    }

    pub fn build(self) -> CsrMatrix {
        let n_rows = self.rows.len();
        let nnz = self.rows.iter().map(|r| r.len()).sum();

        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);

        row_ptr.push(0);
        for row in self.rows {
            for (col, value) in row {
                col_idx.push(col);
                values.push(value);
            }
            row_ptr.push(col_idx.len());
        }

        CsrMatrix {
            n_rows,
            row_ptr,
            col_idx,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiagonal(n: usize) -> CsrMatrix {
        let mut builder = CsrBuilder::new(n);
        for i in 0..n {
            builder.set(i, i, 4.0);
            if i > 0 {
                builder.set(i, i - 1, -1.0);
            }
            if i + 1 < n {
                builder.set(i, i + 1, -1.0);
            }
        }
        builder.build()
    }

    #[test]
    fn build_sorts_columns() {
        let mut builder = CsrBuilder::new(3);
        builder.set(0, 2, 3.0);
        builder.set(0, 0, 1.0);
        builder.set(2, 1, 5.0);
        builder.set(1, 1, 0.0);
        let a = builder.build();

        assert_eq!(a.row_ptr(), &[0, 2, 2, 3]);
        assert_eq!(a.col_idx(), &[0, 2, 1]);
        assert_eq!(a.values(), &[1.0, 3.0, 5.0]);
        assert_eq!(a.get(0, 2), 3.0);
        assert_eq!(a.get(1, 1), 0.0);
    }

    #[test]
    fn zero_overwrites_remove_entries() {
        let mut builder = CsrBuilder::new(2);
        builder.set(0, 1, 2.0);
        builder.set(0, 1, 0.0);
        assert_eq!(builder.build().nnz(), 0);
    }

    #[test]
    fn matrix_vector_product() {
        let a = tridiagonal(4);
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut y = [0.0; 4];
        a.mul_vec(&x, &mut y);
        assert_eq!(y, [2.0, 4.0, 6.0, 13.0]);
    }
}

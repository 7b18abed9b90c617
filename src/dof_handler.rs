use crate::mesh::Mesh2D;
use ndarray::prelude::*;

/// Maps grid nodes `(i, j)` to rows of the linear system, numbering mesh lines of constant `j` in
/// turn: `k = j * (nx + 1) + i`. The dense and sparse strategies must share this numbering for
/// their results to be comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DofHandler {
    nx: usize,
    ny: usize,
}

impl DofHandler {
    pub fn new(mesh: &Mesh2D) -> Self {
        DofHandler {
            nx: mesh.nx(),
            ny: mesh.ny(),
        }
    }

    /// Number of unknowns, `(nx + 1) * (ny + 1)`
    pub fn n_dofs(&self) -> usize {
        (self.nx + 1) * (self.ny + 1)
    }

    /// Distance between the rows of vertically adjacent nodes
    pub fn stride(&self) -> usize {
        self.nx + 1
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i <= self.nx && j <= self.ny);
        j * (self.nx + 1) + i
    }

    /// Inverse of `index`
    #[inline]
    pub fn node(&self, k: usize) -> (usize, usize) {
        debug_assert!(k < self.n_dofs());
        (k % (self.nx + 1), k / (self.nx + 1))
    }

    /// Copy a nodal field into system ordering
    pub fn flatten_into(&self, field: ArrayView2<f64>, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.n_dofs());
        for ((i, j), &value) in field.indexed_iter() {
            out[self.index(i, j)] = value;
        }
    }

    /// Copy a vector in system ordering back onto the nodal field
    pub fn unflatten_into(&self, values: &[f64], mut field: ArrayViewMut2<f64>) {
        debug_assert_eq!(values.len(), self.n_dofs());
        for ((i, j), value) in field.indexed_iter_mut() {
            *value = values[self.index(i, j)];
        }
    }
}

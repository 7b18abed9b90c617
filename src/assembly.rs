//! Construction of the theta-rule system: the constant operator (dense or CSR) and the parts of
//! the right-hand side that change every step.
use crate::dof_handler::DofHandler;
use crate::linalg::csr::{CsrBuilder, CsrMatrix};
use crate::mesh::Mesh2D;
use crate::problem::EdgeValues;
use crate::stencil::{FourierNumbers, ThetaStencil};
use nalgebra::DMatrix;
use ndarray::prelude::*;
use ndarray::Zip;

/// Write the boundary values onto the edges of `field`. The left and right edges are written
/// first, so the corners end up with the bottom and top values.
pub fn impose_boundary(mut field: ArrayViewMut2<f64>, values: EdgeValues) {
    let (n_x, n_y) = field.dim();

    field.slice_mut(s![0, ..]).fill(values.left);
    field.slice_mut(s![n_x - 1, ..]).fill(values.right);
    field.slice_mut(s![.., 0]).fill(values.bottom);
    field.slice_mut(s![.., n_y - 1]).fill(values.top);
}

/// Explicit part of every interior equation, one node at a time. Boundary entries of `out` are
/// left untouched.
pub fn explicit_part_nodewise(
    stencil: &ThetaStencil,
    u_prev: ArrayView2<f64>,
    f_n: ArrayView2<f64>,
    f_np1: ArrayView2<f64>,
    out: &mut Array2<f64>,
) {
    let (n_x, n_y) = u_prev.dim();

    for j in 1..n_y - 1 {
        for i in 1..n_x - 1 {
            out[[i, j]] = stencil.explicit_part(u_prev, i, j, f_n[[i, j]], f_np1[[i, j]]);
        }
    }
}

/// As `explicit_part_nodewise`, but with whole-array arithmetic over shifted interior slices
pub fn explicit_part_sliced(
    stencil: &ThetaStencil,
    u_prev: ArrayView2<f64>,
    f_n: ArrayView2<f64>,
    f_np1: ArrayView2<f64>,
    out: &mut Array2<f64>,
) {
    let FourierNumbers { fx, fy } = stencil.fourier();
    let theta = stencil.theta();
    let dt = stencil.dt();

    Zip::from(out.slice_mut(s![1..-1, 1..-1]))
        .and(u_prev.slice(s![1..-1, 1..-1]))
        .and(u_prev.slice(s![..-2, 1..-1]))
        .and(u_prev.slice(s![2.., 1..-1]))
        .and(u_prev.slice(s![1..-1, ..-2]))
        .and(u_prev.slice(s![1..-1, 2..]))
        .for_each(|out, &c, &w, &e, &s, &n| {
            *out = c + (1.0 - theta) * (fx * (e - 2.0 * c + w) + fy * (n - 2.0 * c + s));
        });

    Zip::from(out.slice_mut(s![1..-1, 1..-1]))
        .and(f_n.slice(s![1..-1, 1..-1]))
        .and(f_np1.slice(s![1..-1, 1..-1]))
        .for_each(|out, &f_n, &f_np1| {
            *out += theta * dt * f_np1 + (1.0 - theta) * dt * f_n;
        });
}

/// The entries of row `(i, j)` of the operator as `(column, value)` pairs, in increasing column
/// order. Boundary rows are identity rows.
fn row_entries(
    stencil: &ThetaStencil,
    mesh: &Mesh2D,
    dofs: &DofHandler,
    i: usize,
    j: usize,
) -> Vec<(usize, f64)> {
    let k = dofs.index(i, j);

    if mesh.is_boundary(i, j) {
        return vec![(k, 1.0)];
    }

    let stride = dofs.stride();
    vec![
        (k - stride, stencil.south_north()),
        (k - 1, stencil.west_east()),
        (k, stencil.centre()),
        (k + 1, stencil.west_east()),
        (k + stride, stencil.south_north()),
    ]
}

/// The full `(nx + 1)(ny + 1)` square operator
pub fn dense_matrix(stencil: &ThetaStencil, mesh: &Mesh2D, dofs: &DofHandler) -> DMatrix<f64> {
    let n = dofs.n_dofs();
    let mut a = DMatrix::zeros(n, n);

    for j in 0..=mesh.ny() {
        for i in 0..=mesh.nx() {
            let k = dofs.index(i, j);
            for (col, value) in row_entries(stencil, mesh, dofs, i, j) {
                a[(k, col)] = value;
            }
        }
    }

    a
}

/// The same operator in CSR form, five diagonals at offsets `0, +-1, +-(nx + 1)`. Entries that
/// are exactly zero (all off-diagonals when `theta = 0`) are not stored.
pub fn sparse_matrix(stencil: &ThetaStencil, mesh: &Mesh2D, dofs: &DofHandler) -> CsrMatrix {
    let mut builder = CsrBuilder::new(dofs.n_dofs());

    for j in 0..=mesh.ny() {
        for i in 0..=mesh.nx() {
            let k = dofs.index(i, j);
            for (col, value) in row_entries(stencil, mesh, dofs, i, j) {
                builder.set(k, col, value);
            }
        }
    }

    builder.build()
}

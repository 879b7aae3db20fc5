use nalgebra::DMatrix;

/// Sum over all entries of the element-wise product of two equally shaped matrices.
#[inline]
pub fn frobenius_inner(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    debug_assert_eq!(a.shape(), b.shape());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Largest absolute difference between a matrix and its transpose, or `None` for a
/// non-square matrix.
pub fn max_asymmetry(m: &DMatrix<f64>) -> Option<f64> {
    if !m.is_square() {
        return None;
    }
    let n = m.nrows();
    let mut worst: f64 = 0.0;
    for i in 0..n {
        for j in 0..i {
            worst = worst.max((m[(i, j)] - m[(j, i)]).abs());
        }
    }
    Some(worst)
}

//! Dense matrix math shared by the recommenders
//!
//! Both models are small dense matrices (products × products, users × users)
//! stored row-major in a single `Vec<f64>`. Row access is a plain slice, so
//! scoring loops stay allocation-free.
//!
//! Smoothing: `smoothed[i][j] = (counts[i][j] + alpha) / (row_total + alpha * n)`
//! turns a count row into a probability distribution that sums to 1 for any
//! `alpha > 0`, including all-zero rows.

/// Row-major dense matrix of f64
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    /// Create a rows × cols matrix of zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        debug_assert!(r < self.rows && c < self.cols);
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        debug_assert!(r < self.rows && c < self.cols);
        self.data[r * self.cols + c] = value;
    }

    #[inline]
    pub fn add_at(&mut self, r: usize, c: usize, delta: f64) {
        debug_assert!(r < self.rows && c < self.cols);
        self.data[r * self.cols + c] += delta;
    }

    /// Borrow row `r` as a slice
    #[inline]
    pub fn row(&self, r: usize) -> &[f64] {
        debug_assert!(r < self.rows);
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_sum(&self, r: usize) -> f64 {
        self.row(r).iter().sum()
    }

    pub fn is_all_zero(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }

    /// Check `m[i][j] == m[j][i]` within `tol` (square matrices only)
    pub fn is_symmetric(&self, tol: f64) -> bool {
        if self.rows != self.cols {
            return false;
        }
        for i in 0..self.rows {
            for j in (i + 1)..self.cols {
                if (self.get(i, j) - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }
}

/// Dot product of two equal-length slices
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute cosine similarity between two vectors
///
/// Mismatched lengths and zero-norm vectors yield 0.0 rather than an error;
/// the callers treat "no overlap" and "no signal" identically.
#[inline]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot(a, b) / (norm_a * norm_b)
}

/// Pairwise cosine similarity of the rows of `m`
///
/// Returns a rows × rows symmetric matrix. Rows with zero norm have
/// similarity 0 against everything, themselves included.
pub fn cosine_similarity_matrix(m: &DenseMatrix) -> DenseMatrix {
    let n = m.rows();
    let norms: Vec<f64> = (0..n).map(|i| dot(m.row(i), m.row(i)).sqrt()).collect();

    let mut out = DenseMatrix::zeros(n, n);
    for i in 0..n {
        if norms[i] == 0.0 {
            continue;
        }
        for j in i..n {
            if norms[j] == 0.0 {
                continue;
            }
            let s = dot(m.row(i), m.row(j)) / (norms[i] * norms[j]);
            out.set(i, j, s);
            out.set(j, i, s);
        }
    }
    out
}

/// Laplace-smooth every row of a count matrix into a probability row
pub fn laplace_smoothed(counts: &DenseMatrix, alpha: f64) -> DenseMatrix {
    debug_assert!(alpha > 0.0, "smoothing factor must be positive");
    let n = counts.cols();
    let mut out = DenseMatrix::zeros(counts.rows(), n);
    for r in 0..counts.rows() {
        let total = counts.row_sum(r);
        let denom = total + alpha * n as f64;
        for c in 0..n {
            out.set(r, c, (counts.get(r, c) + alpha) / denom);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-9);

        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);

        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn test_similarity_matrix_is_symmetric_with_unit_diagonal() {
        let mut m = DenseMatrix::zeros(3, 2);
        m.set(0, 0, 1.0);
        m.set(0, 1, 1.0);
        m.set(1, 0, 1.0);
        m.set(2, 1, 2.0);

        let sim = cosine_similarity_matrix(&m);
        assert!(sim.is_symmetric(1e-12));
        for i in 0..3 {
            assert!((sim.get(i, i) - 1.0).abs() < 1e-9);
        }
        // rows 0 and 1 share one axis
        assert!((sim.get(0, 1) - 1.0 / 2.0_f64.sqrt()).abs() < 1e-9);
        // rows 1 and 2 are orthogonal
        assert!(sim.get(1, 2).abs() < 1e-12);
    }

    #[test]
    fn test_similarity_matrix_zero_row_convention() {
        let mut m = DenseMatrix::zeros(2, 2);
        m.set(0, 0, 3.0);
        // row 1 stays all-zero

        let sim = cosine_similarity_matrix(&m);
        assert_eq!(sim.get(1, 1), 0.0);
        assert_eq!(sim.get(0, 1), 0.0);
        assert_eq!(sim.get(1, 0), 0.0);
    }

    #[test]
    fn test_laplace_rows_sum_to_one() {
        let mut counts = DenseMatrix::zeros(3, 3);
        counts.set(0, 1, 4.0);
        counts.set(0, 2, 2.0);
        counts.set(1, 0, 4.0);
        // row 2 stays all-zero

        for alpha in [0.1, 1.0, 5.0] {
            let probs = laplace_smoothed(&counts, alpha);
            for r in 0..3 {
                assert!(
                    (probs.row_sum(r) - 1.0).abs() < 1e-9,
                    "row {r} sums to {} for alpha {alpha}",
                    probs.row_sum(r)
                );
            }
        }
    }

    #[test]
    fn test_laplace_preserves_count_ordering() {
        let mut counts = DenseMatrix::zeros(2, 2);
        counts.set(0, 1, 10.0);

        let probs = laplace_smoothed(&counts, 1.0);
        assert!(probs.get(0, 1) > probs.get(0, 0));
    }

    #[test]
    fn test_symmetry_check() {
        let mut m = DenseMatrix::zeros(2, 2);
        m.set(0, 1, 1.0);
        assert!(!m.is_symmetric(1e-12));
        m.set(1, 0, 1.0);
        assert!(m.is_symmetric(1e-12));
        assert!(!DenseMatrix::zeros(2, 3).is_symmetric(1e-12));
    }

    #[test]
    fn test_all_zero() {
        assert!(DenseMatrix::zeros(2, 2).is_all_zero());
        let mut m = DenseMatrix::zeros(2, 2);
        m.add_at(1, 1, 1.0);
        assert!(!m.is_all_zero());
    }
}

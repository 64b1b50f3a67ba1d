//! Sparse boolean matrices, the adjacency substrate shared by every engine.
use std::fmt::Debug;

use fixedbitset::FixedBitSet;

/// A sparse boolean matrix.
///
/// Entries are either present (true) or absent (false); there is no third
/// state. Rows store their column indices sorted and deduplicated, which
/// keeps unions, products and Kronecker products cheap for the access
/// pattern of the engines: build once, multiply many times.
#[derive(Clone, PartialEq, Eq)]
pub struct BoolMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Vec<u32>>,
}

impl Debug for BoolMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoolMatrix")
            .field("shape", &(self.rows, self.cols))
            .field("nonzero", &self.iter_nonzero().collect::<Vec<_>>())
            .finish()
    }
}

impl BoolMatrix {
    /// Create a zero matrix of the given shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Vec::new(); rows],
        }
    }

    /// Create an identity matrix of size `n`.
    pub fn identity(n: usize) -> Self {
        Self {
            rows: n,
            cols: n,
            data: (0..n as u32).map(|i| vec![i]).collect(),
        }
    }

    #[inline]
    /// Get the number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    /// Get the number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Set the entry at `(i, j)` to true. Setting an entry twice is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is out of bounds.
    pub fn set(&mut self, i: usize, j: usize) {
        assert!(
            i < self.rows && j < self.cols,
            "entry ({}, {}) out of bounds for a {}x{} matrix",
            i,
            j,
            self.rows,
            self.cols
        );
        let row = &mut self.data[i];
        let j = j as u32;
        if let Err(pos) = row.binary_search(&j) {
            row.insert(pos, j);
        }
    }

    /// Check whether the entry at `(i, j)` is true.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.data[i].binary_search(&(j as u32)).is_ok()
    }

    /// Get the exact number of true entries.
    pub fn nnz(&self) -> usize {
        self.data.iter().map(Vec::len).sum()
    }

    #[inline]
    /// Get the sorted column indices of row `i`.
    pub fn row(&self, i: usize) -> &[u32] {
        &self.data[i]
    }

    /// Element-wise OR of `other` into `self`.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn or_assign(&mut self, other: &BoolMatrix) {
        assert!(
            self.rows == other.rows && self.cols == other.cols,
            "cannot OR a {}x{} matrix into a {}x{} matrix",
            other.rows,
            other.cols,
            self.rows,
            self.cols
        );
        for (dst, src) in self.data.iter_mut().zip(other.data.iter()) {
            if !src.is_empty() {
                merge_sorted(dst, src);
            }
        }
    }

    /// Boolean matrix product: the result has a true entry at `(i, j)` iff
    /// some `k` has `self[i, k]` and `other[k, j]`.
    ///
    /// # Panics
    ///
    /// Panics if `self.cols() != other.rows()`.
    pub fn matmul(&self, other: &BoolMatrix) -> BoolMatrix {
        assert!(
            self.cols == other.rows,
            "cannot multiply a {}x{} matrix by a {}x{} matrix",
            self.rows,
            self.cols,
            other.rows,
            other.cols
        );
        let mut result = BoolMatrix::new(self.rows, other.cols);
        let mut accumulator = FixedBitSet::with_capacity(other.cols);
        for (i, row) in self.data.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            accumulator.clear();
            for &k in row {
                for &j in &other.data[k as usize] {
                    accumulator.insert(j as usize);
                }
            }
            result.data[i] = accumulator.ones().map(|j| j as u32).collect();
        }
        result
    }

    /// Kronecker product. The result has shape
    /// `(rows1 * rows2) x (cols1 * cols2)` and a true entry at
    /// `(i1 * rows2 + i2, j1 * cols2 + j2)` iff `self[i1, j1]` and
    /// `other[i2, j2]`.
    pub fn kron(&self, other: &BoolMatrix) -> BoolMatrix {
        let mut result = BoolMatrix::new(self.rows * other.rows, self.cols * other.cols);
        for (i1, row1) in self.data.iter().enumerate() {
            if row1.is_empty() {
                continue;
            }
            for (i2, row2) in other.data.iter().enumerate() {
                if row2.is_empty() {
                    continue;
                }
                let out = &mut result.data[i1 * other.rows + i2];
                out.reserve(row1.len() * row2.len());
                for &j1 in row1 {
                    let offset = j1 as usize * other.cols;
                    out.extend(row2.iter().map(|&j2| (offset + j2 as usize) as u32));
                }
            }
        }
        result
    }

    /// Block-diagonal composition: a `(rows1 + rows2) x (cols1 + cols2)`
    /// matrix with `self` in the upper-left block and `other` in the
    /// lower-right block.
    pub fn block_diag(&self, other: &BoolMatrix) -> BoolMatrix {
        let mut result = BoolMatrix::new(self.rows + other.rows, self.cols + other.cols);
        for (i, row) in self.data.iter().enumerate() {
            result.data[i] = row.clone();
        }
        for (i, row) in other.data.iter().enumerate() {
            result.data[self.rows + i] = row.iter().map(|&j| j + self.cols as u32).collect();
        }
        result
    }

    /// Iterate over the true entries in row-major order.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.data
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().map(move |&j| (i, j as usize)))
    }
}

/// Merge the sorted slice `src` into the sorted vector `dst`, keeping the
/// result sorted and deduplicated.
fn merge_sorted(dst: &mut Vec<u32>, src: &[u32]) {
    let mut merged = Vec::with_capacity(dst.len() + src.len());
    let (mut a, mut b) = (0, 0);
    while a < dst.len() && b < src.len() {
        match dst[a].cmp(&src[b]) {
            std::cmp::Ordering::Less => {
                merged.push(dst[a]);
                a += 1;
            }
            std::cmp::Ordering::Greater => {
                merged.push(src[b]);
                b += 1;
            }
            std::cmp::Ordering::Equal => {
                merged.push(dst[a]);
                a += 1;
                b += 1;
            }
        }
    }
    merged.extend_from_slice(&dst[a..]);
    merged.extend_from_slice(&src[b..]);
    *dst = merged;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_entries(rows: usize, cols: usize, entries: &[(usize, usize)]) -> BoolMatrix {
        let mut m = BoolMatrix::new(rows, cols);
        for &(i, j) in entries {
            m.set(i, j);
        }
        m
    }

    #[test]
    fn set_is_idempotent() {
        let mut m = BoolMatrix::new(2, 2);
        m.set(0, 1);
        m.set(0, 1);
        assert_eq!(m.nnz(), 1);
        assert!(m.contains(0, 1));
        assert!(!m.contains(1, 0));
    }

    #[test]
    fn or_assign_merges_rows() {
        let mut a = from_entries(2, 3, &[(0, 0), (1, 2)]);
        let b = from_entries(2, 3, &[(0, 1), (1, 2)]);
        a.or_assign(&b);
        assert_eq!(
            a.iter_nonzero().collect::<Vec<_>>(),
            vec![(0, 0), (0, 1), (1, 2)]
        );
    }

    #[test]
    fn matmul_is_boolean() {
        // Two different paths to (0, 1) must still produce a single entry.
        let a = from_entries(1, 2, &[(0, 0), (0, 1)]);
        let b = from_entries(2, 2, &[(0, 1), (1, 1)]);
        let c = a.matmul(&b);
        assert_eq!(c.iter_nonzero().collect::<Vec<_>>(), vec![(0, 1)]);
    }

    #[test]
    fn kron_indexing() {
        let a = from_entries(2, 2, &[(0, 1)]);
        let b = from_entries(2, 2, &[(1, 0)]);
        let c = a.kron(&b);
        assert_eq!(c.rows(), 4);
        assert_eq!(c.cols(), 4);
        // (0, 1) x (1, 0) -> (0 * 2 + 1, 1 * 2 + 0).
        assert_eq!(c.iter_nonzero().collect::<Vec<_>>(), vec![(1, 2)]);
    }

    #[test]
    fn block_diag_offsets() {
        let a = from_entries(1, 1, &[(0, 0)]);
        let b = from_entries(2, 2, &[(0, 1)]);
        let c = a.block_diag(&b);
        assert_eq!(c.rows(), 3);
        assert_eq!(c.cols(), 3);
        assert_eq!(c.iter_nonzero().collect::<Vec<_>>(), vec![(0, 0), (1, 2)]);
    }

    #[test]
    #[should_panic(expected = "cannot multiply")]
    fn matmul_shape_mismatch_panics() {
        let a = BoolMatrix::new(2, 3);
        let b = BoolMatrix::new(2, 3);
        let _ = a.matmul(&b);
    }

    #[test]
    fn identity_matmul_is_noop() {
        let a = from_entries(3, 3, &[(0, 2), (2, 1)]);
        let product = a.matmul(&BoolMatrix::identity(3));
        assert_eq!(product, a);
    }
}

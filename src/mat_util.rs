use crate::{DenseVec, Index, IndexValueVec, SparseMat};
use bit_set::BitSet;
use num_traits::Unsigned;
use sprs::{CsMatI, SpIndex};
use std::ops::{Deref, Range};

pub(crate) trait IndexValuePairs<IndexT: SpIndex + Unsigned, ValueT: Copy>:
    Deref<Target = [(IndexT, ValueT)]>
{
    /// Check that indices are strictly ascending and all smaller than `length`.
    fn is_valid_sparse_vec(&self, length: usize) -> bool {
        // Ascending indices make the last entry the largest one.
        if let Some(&(last, _)) = self.last() {
            if last.index() >= length {
                return false;
            }
        }
        self.windows(2).all(|pair| pair[0].0 < pair[1].0)
    }
}

impl<IndexT, ValueT, PairsT> IndexValuePairs<IndexT, ValueT> for PairsT
where
    IndexT: SpIndex + Unsigned,
    ValueT: Copy,
    PairsT: Deref<Target = [(IndexT, ValueT)]>,
{
}

/// Assemble a CSR matrix from per-row (index, value) pair lists.
///
/// Every row is assumed to satisfy `is_valid_sparse_vec(n_cols)`.
pub(crate) fn csrmat_from_rows(rows: &[IndexValueVec], n_cols: usize) -> SparseMat {
    let nnz: usize = rows.iter().map(Vec::len).sum();
    let mut indptr = Vec::with_capacity(rows.len() + 1);
    let mut indices = Vec::with_capacity(nnz);
    let mut data = Vec::with_capacity(nnz);

    indptr.push(0);
    for row in rows {
        for &(i, v) in row {
            debug_assert!((i as usize) < n_cols);
            indices.push(i);
            data.push(v);
        }
        indptr.push(indices.len() as Index);
    }

    CsMatI::new((rows.len(), n_cols), indptr, indices, data)
}

/// Dense one-vs-all target vector: -1 everywhere, +1 at the given rows.
pub(crate) fn scatter_targets(positives: &[Index], n_instances: usize) -> DenseVec {
    let mut targets = DenseVec::from_elem(n_instances, -1.0);
    for &row in positives {
        targets[row as usize] = 1.0;
    }
    targets
}

/// Slicing and reindexing operations on owned sparse matrices, preserving the
/// storage orientation of the receiver.
pub(crate) trait CsMatTools<N: Copy, I: SpIndex>: Sized {
    /// Copy the selected outer dimensions into a new matrix.
    fn copy_outer_dims(&self, outer: &[usize]) -> Self;

    /// Restrict the inner dimension to `range`, rebasing indices to zero.
    fn restrict_inner_range(&self, range: Range<usize>) -> Self;

    /// Outer dimensions holding at least one entry, in ascending order.
    fn nonempty_outer_dims(&self) -> Vec<usize>;

    /// Drop inner dimensions that hold no entry, reindexing the rest densely.
    ///
    /// Returns the shrunk matrix and the retained original inner indices;
    /// `remap_inner_indices` with that list reverses the operation.
    fn shrink_inner_indices(self) -> (Self, Vec<I>);

    /// Rewrite every inner index through `old_to_new`, resizing the inner
    /// dimension to `n_inner`. The mapping must be injective on the indices
    /// present in the matrix.
    fn remap_inner_indices(self, old_to_new: &[I], n_inner: usize) -> Self;
}

fn assemble<N: Copy, I: SpIndex>(
    csr: bool,
    n_outer: usize,
    n_inner: usize,
    indptr: Vec<I>,
    indices: Vec<I>,
    data: Vec<N>,
) -> CsMatI<N, I> {
    if csr {
        CsMatI::new((n_outer, n_inner), indptr, indices, data)
    } else {
        CsMatI::new_csc((n_inner, n_outer), indptr, indices, data)
    }
}

impl<N: Copy, I: SpIndex> CsMatTools<N, I> for CsMatI<N, I> {
    fn copy_outer_dims(&self, outer: &[usize]) -> Self {
        let mut indptr = Vec::with_capacity(outer.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();

        indptr.push(I::zero());
        for &i in outer {
            if let Some(v) = self.outer_view(i) {
                indices.extend_from_slice(v.indices());
                data.extend_from_slice(v.data());
            }
            indptr.push(I::from_usize(indices.len()));
        }

        assemble(
            self.is_csr(),
            outer.len(),
            self.inner_dims(),
            indptr,
            indices,
            data,
        )
    }

    fn restrict_inner_range(&self, range: Range<usize>) -> Self {
        let mut indptr = Vec::with_capacity(self.outer_dims() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();

        indptr.push(I::zero());
        for i in 0..self.outer_dims() {
            if let Some(v) = self.outer_view(i) {
                for (inner, &value) in v.iter() {
                    if range.contains(&inner) {
                        indices.push(I::from_usize(inner - range.start));
                        data.push(value);
                    }
                }
            }
            indptr.push(I::from_usize(indices.len()));
        }

        assemble(
            self.is_csr(),
            self.outer_dims(),
            range.len(),
            indptr,
            indices,
            data,
        )
    }

    fn nonempty_outer_dims(&self) -> Vec<usize> {
        (0..self.outer_dims())
            .filter(|&i| self.outer_view(i).map_or(false, |v| v.nnz() > 0))
            .collect()
    }

    fn shrink_inner_indices(self) -> (Self, Vec<I>) {
        let n_inner = self.inner_dims();

        let new_index_to_old = {
            let mut occupied = BitSet::with_capacity(n_inner);
            for &i in self.indices() {
                occupied.insert(i.index());
            }
            // BitSet iterates in ascending order.
            occupied.iter().map(I::from_usize).collect::<Vec<_>>()
        };

        let old_index_to_new = {
            let mut lookup = vec![I::zero(); n_inner];
            for (new_index, &old_index) in new_index_to_old.iter().enumerate() {
                lookup[old_index.index()] = I::from_usize(new_index);
            }
            lookup
        };

        let mat = self.remap_inner_indices(&old_index_to_new, new_index_to_old.len());
        (mat, new_index_to_old)
    }

    fn remap_inner_indices(self, old_to_new: &[I], n_inner: usize) -> Self {
        let csr = self.is_csr();
        let n_outer = self.outer_dims();

        let (indptr, mut indices, data) = self.into_raw_storage();
        for index in &mut indices {
            *index = old_to_new[index.index()];
        }
        assemble(csr, n_outer, n_inner, indptr, indices, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_is_valid_sparse_vec() {
        assert!(Vec::<(usize, f64)>::new().is_valid_sparse_vec(0));
        assert!(Vec::<(usize, f64)>::new().is_valid_sparse_vec(123));

        assert!(vec![(123u32, 123.)].is_valid_sparse_vec(124));
        assert!(!vec![(123u32, 123.)].is_valid_sparse_vec(123));

        assert!(vec![(1u32, 0.), (3, 0.), (5, 0.)].is_valid_sparse_vec(6));
        assert!(!vec![(1u32, 0.), (3, 0.), (5, 0.)].is_valid_sparse_vec(5));
        assert!(!vec![(1u32, 0.), (5, 0.), (3, 0.)].is_valid_sparse_vec(6));
        assert!(!vec![(1u32, 0.), (1, 1.)].is_valid_sparse_vec(6));
    }

    #[test]
    fn test_csrmat_from_rows() {
        let rows = vec![vec![(0, 1.), (1, 2.)], vec![(0, 3.), (2, 4.)], vec![(2, 5.)]];
        assert_eq!(
            SparseMat::new(
                (3, 5),
                vec![0, 2, 4, 5],
                vec![0, 1, 0, 2, 2],
                vec![1., 2., 3., 4., 5.],
            ),
            csrmat_from_rows(&rows, 5)
        );
    }

    #[test]
    fn test_scatter_targets() {
        assert_eq!(array![-1.0f32, 1., -1., 1.], scatter_targets(&[1, 3], 4));
        assert_eq!(array![-1.0f32, -1.], scatter_targets(&[], 2));
    }

    #[test]
    fn test_copy_outer_dims_csr() {
        let mat = sprs::CsMat::new(
            (3, 3),
            vec![0, 2, 4, 5],
            vec![0, 1, 0, 2, 2],
            vec![1, 2, 3, 4, 5],
        );
        assert_eq!(
            sprs::CsMat::new(
                (4, 3),
                vec![0, 2, 3, 3, 5],
                vec![0, 1, 2, 0, 2],
                vec![1, 2, 5, 3, 4],
            ),
            mat.copy_outer_dims(&[0, 2, 3, 1])
        );
    }

    #[test]
    fn test_copy_outer_dims_csc() {
        // Columns of a 2x3 CSC matrix; selecting columns keeps CSC storage.
        let mat = sprs::CsMat::new_csc(
            (2, 3),
            vec![0, 1, 2, 3],
            vec![0, 1, 0],
            vec![1, 2, 3],
        );
        assert_eq!(
            sprs::CsMat::new_csc((2, 2), vec![0, 1, 2], vec![0, 0], vec![3, 1]),
            mat.copy_outer_dims(&[2, 0])
        );
    }

    #[test]
    fn test_restrict_inner_range() {
        let mat = sprs::CsMat::new(
            (3, 5),
            vec![0, 2, 4, 5],
            vec![0, 1, 1, 4, 2],
            vec![1, 2, 3, 4, 5],
        );
        assert_eq!(
            sprs::CsMat::new((3, 3), vec![0, 1, 2, 3], vec![0, 0, 1], vec![2, 3, 5]),
            mat.restrict_inner_range(1..4)
        );
    }

    #[test]
    fn test_nonempty_outer_dims() {
        let mat = sprs::CsMat::new(
            (4, 3),
            vec![0, 2, 2, 3, 3],
            vec![0, 1, 2],
            vec![1, 2, 3],
        );
        assert_eq!(vec![0, 2], mat.nonempty_outer_dims());
    }

    #[test]
    fn test_remap_inner_indices() {
        let mat = sprs::CsMat::new(
            (3, 3),
            vec![0, 2, 4, 5],
            vec![0, 1, 0, 2, 2],
            vec![1, 2, 3, 4, 5],
        );
        assert_eq!(
            sprs::CsMat::new(
                (3, 2000),
                vec![0, 2, 4, 5],
                vec![10, 100, 10, 1000, 1000],
                vec![1, 2, 3, 4, 5],
            ),
            mat.remap_inner_indices(&[10, 100, 1000], 2000)
        );
    }

    #[test]
    fn test_shrink_inner_indices() {
        let mat = sprs::CsMat::new(
            (3, 2000),
            vec![0, 2, 4, 5],
            vec![10, 100, 10, 1000, 1000],
            vec![1, 2, 3, 4, 5],
        );
        assert_eq!(
            (
                sprs::CsMat::new(
                    (3, 3),
                    vec![0, 2, 4, 5],
                    vec![0, 1, 0, 2, 2],
                    vec![1, 2, 3, 4, 5],
                ),
                vec![10, 100, 1000]
            ),
            mat.shrink_inner_indices()
        );
    }
}

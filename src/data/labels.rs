use crate::mat_util::{csrmat_from_rows, CsMatTools};
use crate::{Index, Result, SparseMat, SparseVecView};
use std::ops::Range;
use std::path::Path;

/// Physical orientation of the label matrix, fixed at construction.
///
/// Label-major storage (CSC) makes column slices cheap, instance-major
/// storage (CSR) makes row slices cheap.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum LabelLayout {
    LabelMajor,
    InstanceMajor,
}

/// Sparse label matrix with logical shape (instances x labels).
///
/// Ground truth holds presence entries; after a shortlist update the rows hold
/// +1/-1 classification targets. Only the shortlist updater replaces the
/// matrix, and it preserves shape and layout.
#[derive(Clone, Debug)]
pub struct LabelMat {
    mat: SparseMat,
}

impl LabelMat {
    pub(crate) fn load(path: &Path, layout: LabelLayout) -> Result<Self> {
        let file = super::read_sparse_text_file(path)?;
        let mat = csrmat_from_rows(&file.rows, file.n_cols);
        let mat = match layout {
            LabelLayout::InstanceMajor => mat,
            LabelLayout::LabelMajor => mat.to_other_storage(),
        };
        Ok(Self { mat })
    }

    pub fn num_instances(&self) -> usize {
        self.mat.rows()
    }

    pub fn num_labels(&self) -> usize {
        self.mat.cols()
    }

    pub(crate) fn layout(&self) -> LabelLayout {
        if self.mat.is_csc() {
            LabelLayout::LabelMajor
        } else {
            LabelLayout::InstanceMajor
        }
    }

    /// Column slice of one label (label-major layout).
    pub(crate) fn label_column(&self, label: usize) -> Option<SparseVecView<'_>> {
        debug_assert_eq!(LabelLayout::LabelMajor, self.layout());
        self.mat.outer_view(label)
    }

    /// Row slice of one instance (instance-major layout).
    pub(crate) fn instance_row(&self, instance: usize) -> Option<SparseVecView<'_>> {
        debug_assert_eq!(LabelLayout::InstanceMajor, self.layout());
        self.mat.outer_view(instance)
    }

    /// Copy the rows of a contiguous instance chunk, keeping sparse storage.
    pub(crate) fn select_instances(&self, instances: Range<usize>) -> SparseMat {
        debug_assert_eq!(LabelLayout::InstanceMajor, self.layout());
        self.mat.copy_outer_dims(&instances.collect::<Vec<_>>())
    }

    /// Restrict the label axis to columns `[range.start, range.end)`.
    pub(crate) fn restrict_labels(&mut self, range: Range<usize>) {
        self.mat = match self.layout() {
            LabelLayout::LabelMajor => self.mat.copy_outer_dims(&range.collect::<Vec<_>>()),
            LabelLayout::InstanceMajor => self.mat.restrict_inner_range(range),
        };
    }

    /// Drop labels with no positive instance, reindexing the rest densely.
    ///
    /// Returns the retained original column indices so downstream prediction
    /// scores can be re-aligned.
    pub(crate) fn remove_invalid(&mut self) -> Vec<Index> {
        match self.layout() {
            LabelLayout::LabelMajor => {
                let valid = self.mat.nonempty_outer_dims();
                self.mat = self.mat.copy_outer_dims(&valid);
                valid.into_iter().map(|i| i as Index).collect()
            }
            LabelLayout::InstanceMajor => {
                let mat = std::mem::replace(&mut self.mat, SparseMat::zero((0, 0)));
                let (mat, valid) = mat.shrink_inner_indices();
                self.mat = mat;
                valid
            }
        }
    }

    /// Swap in a rebuilt matrix. Shape and layout must be unchanged.
    pub(crate) fn replace(&mut self, mat: SparseMat) {
        debug_assert_eq!(self.mat.shape(), mat.shape());
        debug_assert_eq!(self.mat.is_csr(), mat.is_csr());
        self.mat = mat;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 4 instances x 5 labels; label 3 has no positive instance.
    fn ground_truth(layout: LabelLayout) -> LabelMat {
        let rows = vec![
            vec![(0, 1.), (4, 1.)],
            vec![(1, 1.)],
            vec![(2, 1.)],
            vec![(1, 1.), (2, 1.)],
        ];
        let mat = csrmat_from_rows(&rows, 5);
        let mat = match layout {
            LabelLayout::InstanceMajor => mat,
            LabelLayout::LabelMajor => mat.to_other_storage(),
        };
        LabelMat { mat }
    }

    #[test]
    fn test_shape_accessors() {
        for layout in [LabelLayout::LabelMajor, LabelLayout::InstanceMajor] {
            let labels = ground_truth(layout);
            assert_eq!(4, labels.num_instances());
            assert_eq!(5, labels.num_labels());
            assert_eq!(layout, labels.layout());
        }
    }

    #[test]
    fn test_label_column() {
        let labels = ground_truth(LabelLayout::LabelMajor);
        let col = labels.label_column(1).unwrap();
        assert_eq!([1u32, 3].as_slice(), col.indices());
        assert_eq!(0, labels.label_column(3).unwrap().nnz());
    }

    #[test]
    fn test_select_instances() {
        let labels = ground_truth(LabelLayout::InstanceMajor);
        let chunk = labels.select_instances(1..3);
        assert_eq!((2, 5), chunk.shape());
        assert_eq!([1u32, 2].as_slice(), chunk.indices());
    }

    #[test]
    fn test_restrict_labels() {
        for layout in [LabelLayout::LabelMajor, LabelLayout::InstanceMajor] {
            let mut labels = ground_truth(layout);
            labels.restrict_labels(1..5);
            assert_eq!(4, labels.num_labels());
            assert_eq!(4, labels.num_instances());
            assert_eq!(layout, labels.layout());

            // Instance 0 kept only its entry for original label 4, now column 3.
            let positives = match layout {
                LabelLayout::LabelMajor => labels.label_column(3).unwrap().indices().to_vec(),
                LabelLayout::InstanceMajor => labels.instance_row(0).unwrap().indices().to_vec(),
            };
            assert_eq!(vec![match layout {
                LabelLayout::LabelMajor => 0,
                LabelLayout::InstanceMajor => 3,
            }], positives);
        }
    }

    #[test]
    fn test_remove_invalid() {
        for layout in [LabelLayout::LabelMajor, LabelLayout::InstanceMajor] {
            let mut labels = ground_truth(layout);
            let valid = labels.remove_invalid();
            assert_eq!(vec![0, 1, 2, 4], valid);
            assert_eq!(4, labels.num_labels());
            assert_eq!(layout, labels.layout());
        }
    }

    #[test]
    fn test_restrict_then_remove_invalid() {
        // Restricting to [1, 5) leaves original label 3 (now column 2) with no
        // positives; it is excluded and the rest recorded.
        let mut labels = ground_truth(LabelLayout::LabelMajor);
        labels.restrict_labels(1..5);
        let valid = labels.remove_invalid();
        assert_eq!(vec![0, 1, 3], valid);
        assert_eq!(3, labels.num_labels());
    }
}

use crate::mat_util::csrmat_from_rows;
use crate::{DenseMat, DenseVecView, Error, Result, SparseMat, SparseVecView};
use sprs::SpIndex;
use std::path::Path;
use std::str::FromStr;

/// In-memory representation chosen for the feature matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FeatureType {
    Sparse,
    Dense,
}

impl FromStr for FeatureType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sparse" => Ok(Self::Sparse),
            "dense" => Ok(Self::Dense),
            _ => Err(Error::Config(format!("unknown feature type \"{}\"", s))),
        }
    }
}

/// Row-wise feature normalization applied once after loading.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Normalization {
    None,
    L1,
    L2,
    Max,
}

impl FromStr for Normalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "l1" => Ok(Self::L1),
            "l2" => Ok(Self::L2),
            "max" => Ok(Self::Max),
            _ => Err(Error::Config(format!("unknown normalization \"{}\"", s))),
        }
    }
}

fn norm_of(values: impl Iterator<Item = f32>, norm: Normalization) -> f32 {
    match norm {
        Normalization::None => 1.,
        Normalization::L1 => values.map(f32::abs).sum(),
        Normalization::L2 => values.map(|v| v * v).sum::<f32>().sqrt(),
        Normalization::Max => values.map(f32::abs).fold(0., f32::max),
    }
}

fn scale_row(values: &mut [f32], norm: Normalization) {
    let length = norm_of(values.iter().copied(), norm);
    if length > 0. {
        for v in values {
            *v /= length;
        }
    }
}

/// Feature matrix storage, sparse (CSR) or dense.
#[derive(Clone, Debug)]
pub enum Features {
    Sparse(SparseMat),
    Dense(DenseMat),
}

/// One instance's feature vector.
#[derive(Clone, Debug)]
pub enum FeatureRow<'a> {
    Sparse(SparseVecView<'a>),
    Dense(DenseVecView<'a>),
}

/// The loaded feature matrix shared by every materialized batch.
///
/// The instance count is fixed at load time and normalization is applied at
/// most once; after that the set is only ever read.
#[derive(Clone, Debug)]
pub struct FeatureSet {
    data: Features,
    normalized: bool,
}

impl FeatureSet {
    pub(crate) fn load(path: &Path, feature_type: FeatureType) -> Result<Self> {
        let file = super::read_sparse_text_file(path)?;
        let data = match feature_type {
            FeatureType::Sparse => Features::Sparse(csrmat_from_rows(&file.rows, file.n_cols)),
            FeatureType::Dense => {
                let mut mat = DenseMat::zeros((file.n_rows, file.n_cols));
                for (row, pairs) in file.rows.iter().enumerate() {
                    for &(i, v) in pairs {
                        mat[[row, i as usize]] = v;
                    }
                }
                Features::Dense(mat)
            }
        };
        Ok(Self {
            data,
            normalized: false,
        })
    }

    pub fn num_instances(&self) -> usize {
        match &self.data {
            Features::Sparse(mat) => mat.rows(),
            Features::Dense(mat) => mat.nrows(),
        }
    }

    pub fn num_features(&self) -> usize {
        match &self.data {
            Features::Sparse(mat) => mat.cols(),
            Features::Dense(mat) => mat.ncols(),
        }
    }

    pub fn data(&self) -> &Features {
        &self.data
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Feature vector of instance `i`.
    pub fn instance(&self, i: usize) -> Option<FeatureRow<'_>> {
        match &self.data {
            Features::Sparse(mat) => mat.outer_view(i).map(FeatureRow::Sparse),
            Features::Dense(mat) => {
                if i < mat.nrows() {
                    Some(FeatureRow::Dense(mat.row(i)))
                } else {
                    None
                }
            }
        }
    }

    /// Normalize every instance row in place. A second call is a no-op.
    pub fn normalize(&mut self, norm: Normalization) {
        if self.normalized || norm == Normalization::None {
            return;
        }
        match &mut self.data {
            Features::Sparse(mat) => {
                let owned = std::mem::replace(mat, SparseMat::zero((0, 0)));
                let (n_rows, n_cols) = owned.shape();
                let (indptr, indices, mut data) = owned.into_raw_storage();
                for bounds in indptr.windows(2) {
                    scale_row(&mut data[bounds[0].index()..bounds[1].index()], norm);
                }
                *mat = SparseMat::new((n_rows, n_cols), indptr, indices, data);
            }
            Features::Dense(mat) => {
                for mut row in mat.rows_mut() {
                    let length = norm_of(row.iter().copied(), norm);
                    if length > 0. {
                        row.mapv_inplace(|v| v / length);
                    }
                }
            }
        }
        self.normalized = true;
    }
}

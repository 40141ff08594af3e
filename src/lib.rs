pub type Index = u32;
pub type IndexValueVec = Vec<(Index, f32)>;
pub type IndexSet = hashbrown::HashSet<Index>;
pub type SparseVecView<'a> = sprs::CsVecViewI<'a, f32, Index>;
pub type SparseMat = sprs::CsMatI<f32, Index>;
pub type SparseMatView<'a> = sprs::CsMatViewI<'a, f32, Index>;
pub type DenseVec = ndarray::Array1<f32>;
pub type DenseVecView<'a> = ndarray::ArrayView1<'a, f32>;
pub type DenseMat = ndarray::Array2<f32>;

pub mod data;
pub mod error;
pub mod loader;
mod mat_util;

pub use crate::data::{FeatureRow, FeatureSet, FeatureType, Features, LabelMat, Normalization};
pub use crate::error::{Error, Result};
pub use crate::loader::{
    Batch, BatchOrder, Batches, DataLoader, InstanceBatch, LoaderConfig, Mode, ShortlistItem,
    ShortlistLoader, TargetItem,
};

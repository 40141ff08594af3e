//! Batched loaders over feature/label files.
//!
//! `DataLoader` materializes dense one-vs-all targets per label,
//! `ShortlistLoader` materializes per-instance sparse shortlist targets and
//! rebuilds the shortlist between epochs. Both walk an immutable batch plan
//! computed once at construction, so iteration is restartable and
//! deterministic.

use crate::data::{FeatureSet, FeatureType, LabelLayout, LabelMat, Normalization};
use crate::{Error, Index, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod batch;
mod shortlist;

pub use self::batch::{Batch, Batches, InstanceBatch, ShortlistItem, TargetItem};

/// Whether invalid labels are filtered out at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Remove labels without positive instances; record the survivors.
    Train,
    /// Keep the original label indexing so scores stay aligned.
    Predict,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Self::Train),
            "predict" => Ok(Self::Predict),
            _ => Err(Error::Config(format!("unknown mode \"{}\"", s))),
        }
    }
}

/// Axis the batch plan partitions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BatchOrder {
    Labels,
    Instances,
}

impl FromStr for BatchOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "labels" => Ok(Self::Labels),
            "instances" => Ok(Self::Instances),
            _ => Err(Error::Config(format!("unknown batch order \"{}\"", s))),
        }
    }
}

/// Construction options for both loader flavors.
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    /// Directory holding one subdirectory per dataset.
    pub data_dir: PathBuf,
    /// Dataset name, e.g. `EURLex-4K`.
    pub dataset: String,
    pub feature_filename: String,
    pub label_filename: String,
    /// Target chunk size of the batch plan.
    pub batch_size: usize,
    pub feature_type: FeatureType,
    pub mode: Mode,
    pub batch_order: BatchOrder,
    pub normalization: Normalization,
    /// First label column to train on.
    pub start_index: usize,
    /// One past the last label column; `None` means "to the end".
    pub end_index: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            dataset: String::new(),
            feature_filename: "trn_X_Xf.txt".to_owned(),
            label_filename: "trn_X_Y.txt".to_owned(),
            batch_size: 1000,
            feature_type: FeatureType::Sparse,
            mode: Mode::Train,
            batch_order: BatchOrder::Labels,
            normalization: Normalization::L2,
            start_index: 0,
            end_index: None,
        }
    }
}

/// Target representation the materializer produces for label-major chunks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TargetKind {
    Dense,
    Shortlist,
}

/// Valid-label bookkeeping persisted across runs.
#[derive(Debug, Serialize, Deserialize)]
struct Checkpoint {
    num_labels: usize,
    num_labels_original: usize,
    valid_labels: Option<Vec<Index>>,
}

pub(crate) struct LoaderCore {
    pub(crate) features: FeatureSet,
    pub(crate) labels: LabelMat,
    pub(crate) batch_order: BatchOrder,
    pub(crate) batches: Vec<Range<usize>>,
    num_labels_original: usize,
    valid_labels: Option<Vec<Index>>,
}

impl LoaderCore {
    fn construct(config: &LoaderConfig, kind: TargetKind) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(Error::Config("batch_size must be positive".to_owned()));
        }

        // Dense one-vs-all targets are built from label columns; everything
        // else slices instance rows.
        let label_major = kind == TargetKind::Dense && config.batch_order == BatchOrder::Labels;
        let layout = if label_major {
            LabelLayout::LabelMajor
        } else {
            LabelLayout::InstanceMajor
        };

        let dataset_dir = config.data_dir.join(&config.dataset);
        let mut features = FeatureSet::load(
            &dataset_dir.join(&config.feature_filename),
            config.feature_type,
        )?;
        let mut labels = LabelMat::load(&dataset_dir.join(&config.label_filename), layout)?;
        if features.num_instances() != labels.num_instances() {
            return Err(Error::Parse(format!(
                "feature file has {} instances but label file has {}",
                features.num_instances(),
                labels.num_instances()
            )));
        }
        features.normalize(config.normalization);

        let num_labels_original = labels.num_labels();
        let mut valid_labels = None;
        if config.mode == Mode::Train {
            if config.start_index != 0 || config.end_index.is_some() {
                let end = config.end_index.unwrap_or(num_labels_original);
                if end <= config.start_index || end > num_labels_original {
                    return Err(Error::Config(format!(
                        "label range [{}, {}) is invalid for {} labels",
                        config.start_index, end, num_labels_original
                    )));
                }
                labels.restrict_labels(config.start_index..end);
            }
            valid_labels = Some(labels.remove_invalid());
        }

        let n = if label_major {
            labels.num_labels()
        } else {
            features.num_instances()
        };
        let batches = batch::gen_batches(n, config.batch_size);

        info!(
            "Constructed loader over {} instances, {} features, {} labels ({} batches)",
            features.num_instances(),
            features.num_features(),
            labels.num_labels(),
            batches.len()
        );
        Ok(Self {
            features,
            labels,
            batch_order: config.batch_order,
            batches,
            num_labels_original,
            valid_labels,
        })
    }

    fn get_stats(&self) -> (usize, usize, usize) {
        (
            self.features.num_instances(),
            self.features.num_features(),
            self.labels.num_labels(),
        )
    }

    fn save_state(&self, path: &Path) -> Result<()> {
        let state = Checkpoint {
            num_labels: self.labels.num_labels(),
            num_labels_original: self.num_labels_original,
            valid_labels: self.valid_labels.clone(),
        };
        bincode::serialize_into(BufWriter::new(File::create(path)?), &state)?;
        Ok(())
    }

    fn load_state(&mut self, path: &Path) -> Result<()> {
        let state: Checkpoint = bincode::deserialize_from(BufReader::new(File::open(path)?))?;
        self.num_labels_original = state.num_labels_original;
        self.valid_labels = state.valid_labels;
        Ok(())
    }
}

macro_rules! delegate_loader_api {
    () => {
        pub fn num_instances(&self) -> usize {
            self.core.features.num_instances()
        }

        pub fn num_features(&self) -> usize {
            self.core.features.num_features()
        }

        /// Current label count, after any restriction and filtering.
        pub fn num_labels(&self) -> usize {
            self.core.labels.num_labels()
        }

        /// Label count before restriction and filtering.
        pub fn num_labels_original(&self) -> usize {
            self.core.num_labels_original
        }

        pub fn num_batches(&self) -> usize {
            self.core.batches.len()
        }

        /// (instances, features, labels).
        pub fn get_stats(&self) -> (usize, usize, usize) {
            self.core.get_stats()
        }

        /// Original column indices retained by invalid-label filtering, when
        /// it ran.
        pub fn valid_labels(&self) -> Option<&[Index]> {
            self.core.valid_labels.as_deref()
        }

        pub fn features(&self) -> &FeatureSet {
            &self.core.features
        }

        /// Persist the valid-label bookkeeping.
        pub fn save(&self, path: &Path) -> Result<()> {
            self.core.save_state(path)
        }

        /// Restore valid-label bookkeeping saved by an earlier run.
        pub fn load(&mut self, path: &Path) -> Result<()> {
            self.core.load_state(path)
        }
    };
}

/// Loader for one-vs-all extreme classifiers: label-major batches carry one
/// dense +1/-1 target vector per label.
pub struct DataLoader {
    core: LoaderCore,
}

impl DataLoader {
    pub fn new(config: &LoaderConfig) -> Result<Self> {
        Ok(Self {
            core: LoaderCore::construct(config, TargetKind::Dense)?,
        })
    }

    /// Walk the batch plan from the beginning.
    pub fn iter(&self) -> Batches<'_> {
        Batches::new(&self.core, TargetKind::Dense)
    }

    delegate_loader_api!();
}

/// Loader for extreme classifiers trained against a negative-sampling
/// shortlist: label-major batches carry each instance's sparse shortlist row.
pub struct ShortlistLoader {
    core: LoaderCore,
}

impl ShortlistLoader {
    pub fn new(config: &LoaderConfig) -> Result<Self> {
        Ok(Self {
            core: LoaderCore::construct(config, TargetKind::Shortlist)?,
        })
    }

    /// Walk the batch plan from the beginning.
    pub fn iter(&self) -> Batches<'_> {
        Batches::new(&self.core, TargetKind::Shortlist)
    }

    delegate_loader_api!();
}

use super::{BatchOrder, LoaderCore, TargetKind};
use crate::data::FeatureSet;
use crate::mat_util::scatter_targets;
use crate::{DenseVec, Index, SparseMat, SparseVecView};
use std::ops::Range;

/// Split `[0, n)` into `ceil(n / batch_size)` contiguous chunks.
///
/// Chunk sizes differ by at most one, larger chunks first, matching numpy's
/// `array_split`.
pub(crate) fn gen_batches(n: usize, batch_size: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let n_batches = (n + batch_size - 1) / batch_size;
    let base = n / n_batches;
    let extra = n % n_batches;

    let mut batches = Vec::with_capacity(n_batches);
    let mut start = 0;
    for i in 0..n_batches {
        let len = base + usize::from(i < extra);
        batches.push(start..start + len);
        start += len;
    }
    batches
}

/// One-vs-all targets for a single label.
pub struct TargetItem<'a> {
    pub features: &'a FeatureSet,
    /// Instance subset the targets apply to; `None` means every instance.
    pub instances: Option<Vec<Index>>,
    /// Dense +1/-1 vector of length `num_instances`.
    pub targets: DenseVec,
}

/// A contiguous chunk of instances with their label rows.
pub struct InstanceBatch<'a> {
    pub features: &'a FeatureSet,
    pub instances: Vec<Index>,
    /// Row slice of the label matrix, sparse format preserved.
    pub labels: SparseMat,
}

/// One instance's shortlist: candidate labels with +1/-1 targets.
pub struct ShortlistItem<'a> {
    pub features: &'a FeatureSet,
    row: SparseVecView<'a>,
}

impl<'a> ShortlistItem<'a> {
    /// Shortlisted label indices for this instance.
    pub fn labels(&self) -> &[Index] {
        self.row.indices()
    }

    /// The +1/-1 target for each shortlisted label.
    pub fn targets(&self) -> &[f32] {
        self.row.data()
    }
}

/// A materialized batch.
pub enum Batch<'a> {
    /// Label-major one-vs-all: one dense target vector per label in the chunk.
    Targets(Vec<TargetItem<'a>>),
    /// Label-major shortlist: one sparse row per instance in the chunk.
    Shortlist(Vec<ShortlistItem<'a>>),
    /// Instance-major chunk.
    Instances(InstanceBatch<'a>),
}

impl LoaderCore {
    /// Materialize one chunk of the batch plan. Pure: repeated calls with
    /// unchanged state produce identical output.
    pub(crate) fn materialize(&self, chunk: Range<usize>, kind: TargetKind) -> Batch<'_> {
        match (self.batch_order, kind) {
            (BatchOrder::Instances, _) => Batch::Instances(self.instance_batch(chunk)),
            (BatchOrder::Labels, TargetKind::Dense) => Batch::Targets(self.target_batch(chunk)),
            (BatchOrder::Labels, TargetKind::Shortlist) => {
                Batch::Shortlist(self.shortlist_batch(chunk))
            }
        }
    }

    fn instance_batch(&self, chunk: Range<usize>) -> InstanceBatch<'_> {
        InstanceBatch {
            features: &self.features,
            instances: chunk.clone().map(|i| i as Index).collect(),
            labels: self.labels.select_instances(chunk),
        }
    }

    fn target_batch(&self, chunk: Range<usize>) -> Vec<TargetItem<'_>> {
        let n_instances = self.features.num_instances();
        chunk
            .map(|label| {
                // Fresh vector per label; nothing is retained across labels.
                let targets = match self.labels.label_column(label) {
                    Some(column) => scatter_targets(column.indices(), n_instances),
                    None => DenseVec::from_elem(n_instances, -1.),
                };
                TargetItem {
                    features: &self.features,
                    instances: None,
                    targets,
                }
            })
            .collect()
    }

    fn shortlist_batch(&self, chunk: Range<usize>) -> Vec<ShortlistItem<'_>> {
        chunk
            .filter_map(|instance| self.labels.instance_row(instance))
            .map(|row| ShortlistItem {
                features: &self.features,
                row,
            })
            .collect()
    }
}

/// Restartable iterator over the batch plan; every `iter()` call on a loader
/// starts over from the first chunk.
pub struct Batches<'a> {
    core: &'a LoaderCore,
    kind: TargetKind,
    next: usize,
}

impl<'a> Batches<'a> {
    pub(crate) fn new(core: &'a LoaderCore, kind: TargetKind) -> Self {
        Self {
            core,
            kind,
            next: 0,
        }
    }
}

impl<'a> Iterator for Batches<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Batch<'a>> {
        let chunk = self.core.batches.get(self.next)?.clone();
        self.next += 1;
        Some(self.core.materialize(chunk, self.kind))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.core.batches.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::{BatchOrder, DataLoader, LoaderConfig};
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gen_batches_sizes() {
        assert_eq!(vec![0..2, 2..3], gen_batches(3, 2));
        assert_eq!(vec![0..2, 2..4], gen_batches(4, 2));
        assert_eq!(vec![0..2, 2..4, 4..5], gen_batches(5, 2));
        assert_eq!(vec![0..3, 3..6, 6..8, 8..10], gen_batches(10, 3));
        assert_eq!(vec![0..1], gen_batches(1, 1000));
        assert!(gen_batches(0, 10).is_empty());
    }

    #[test]
    fn test_gen_batches_partition_properties() {
        for (n, batch_size) in [(1, 1), (7, 3), (100, 7), (100, 100), (101, 100)] {
            let batches = gen_batches(n, batch_size);
            assert_eq!((n + batch_size - 1) / batch_size, batches.len());

            let sizes: Vec<usize> = batches.iter().map(|chunk| chunk.len()).collect();
            let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
            assert!(max - min <= 1);

            let concat: Vec<usize> = batches.into_iter().flatten().collect();
            assert_eq!((0..n).collect::<Vec<_>>(), concat);
        }
    }

    #[test]
    fn test_one_vs_all_targets() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DataLoader::new(&toy_config(dir.path())).unwrap();

        let mut batches = loader.iter();
        assert_eq!(2, batches.len());
        match batches.next().unwrap() {
            Batch::Targets(items) => {
                assert_eq!(2, items.len());
                assert!(items[0].instances.is_none());
                assert_eq!(array![1.0f32, -1., -1., -1.], items[0].targets);
                assert_eq!(array![-1.0f32, 1., -1., -1.], items[1].targets);
            }
            _ => unreachable!(),
        }
        match batches.next().unwrap() {
            Batch::Targets(items) => {
                assert_eq!(1, items.len());
                assert_eq!(array![-1.0f32, -1., 1., -1.], items[0].targets);
            }
            _ => unreachable!(),
        }
        assert!(batches.next().is_none());
    }

    #[test]
    fn test_positive_counts_match_columns() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DataLoader::new(&toy_config(dir.path())).unwrap();
        for batch in loader.iter() {
            if let Batch::Targets(items) = batch {
                for item in items {
                    let positives = item.targets.iter().filter(|&&v| v > 0.).count();
                    assert_eq!(1, positives);
                    assert_eq!(4, item.targets.len());
                }
            }
        }
    }

    #[test]
    fn test_iteration_is_restartable_and_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DataLoader::new(&toy_config(dir.path())).unwrap();

        let collect_targets = || {
            loader
                .iter()
                .flat_map(|batch| match batch {
                    Batch::Targets(items) => items.into_iter().map(|i| i.targets).collect(),
                    _ => Vec::new(),
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(collect_targets(), collect_targets());
    }

    #[test]
    fn test_instance_major_batches() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoaderConfig {
            batch_order: BatchOrder::Instances,
            ..toy_config(dir.path())
        };
        let loader = DataLoader::new(&config).unwrap();
        assert_eq!(2, loader.num_batches());

        let mut batches = loader.iter();
        match batches.next().unwrap() {
            Batch::Instances(batch) => {
                assert_eq!(vec![0, 1], batch.instances);
                assert_eq!((2, 3), batch.labels.shape());
                assert_eq!([0u32, 1].as_slice(), batch.labels.indices());
            }
            _ => unreachable!(),
        }
        match batches.next().unwrap() {
            Batch::Instances(batch) => {
                assert_eq!(vec![2, 3], batch.instances);
                // Instance 3 has no labels.
                assert_eq!([2u32].as_slice(), batch.labels.indices());
            }
            _ => unreachable!(),
        }
    }
}

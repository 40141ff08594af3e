use super::ShortlistLoader;
use crate::{Error, Index, IndexSet, Result, SparseMat};
use log::info;
use pbr::ProgressBar;
use sprs::TriMatI;
use std::io::stderr;

impl ShortlistLoader {
    /// Rebuild the label matrix from each instance's current positives plus
    /// its mined hard-negative candidates.
    ///
    /// `candidates[i]` holds the ranked candidate label indices for instance
    /// `i` and `scores[i]` their similarity scores; both outer sequences must
    /// have one entry per instance and matching inner lengths. Candidates are
    /// taken as pre-truncated by the caller. The index `num_labels` is the
    /// padding sentinel and is skipped; positives that leaked into the
    /// candidate list are dropped rather than re-emitted as negatives.
    ///
    /// The rebuild is all-or-nothing: every candidate index is validated
    /// before the first triple is assembled, so a failed update leaves the
    /// matrix untouched.
    pub fn update_shortlist(
        &mut self,
        candidates: &[Vec<Index>],
        scores: &[Vec<f32>],
    ) -> Result<()> {
        let n_instances = self.core.labels.num_instances();
        let num_labels = self.core.labels.num_labels();
        let sentinel = num_labels as Index;

        if candidates.len() != n_instances || scores.len() != n_instances {
            return Err(Error::Config(format!(
                "expected shortlists for {} instances, got {} candidate and {} score rows",
                n_instances,
                candidates.len(),
                scores.len()
            )));
        }
        for (instance, (row, row_scores)) in candidates.iter().zip(scores).enumerate() {
            if row.len() != row_scores.len() {
                return Err(Error::Config(format!(
                    "instance {}: {} candidates but {} scores",
                    instance,
                    row.len(),
                    row_scores.len()
                )));
            }
            for &candidate in row {
                if candidate != sentinel && candidate as usize >= num_labels {
                    return Err(Error::LabelIndexOutOfRange {
                        index: candidate,
                        num_labels,
                    });
                }
            }
        }

        info!("Updating shortlist for {} instances", n_instances);
        let start_t = time::precise_time_s();
        let mut pb = ProgressBar::on(stderr(), n_instances as u64);

        let mut triples = TriMatI::<f32, Index>::new((n_instances, num_labels));
        for (instance, row) in candidates.iter().enumerate() {
            // Entries with positive values are the true positives; after the
            // first update the row also holds -1 entries for old negatives.
            let mut excluded = IndexSet::new();
            if let Some(current) = self.core.labels.instance_row(instance) {
                for (label, &value) in current.iter() {
                    if value > 0. {
                        excluded.insert(label as Index);
                        triples.add_triplet(instance, label, 1.);
                    }
                }
            }

            excluded.insert(sentinel);
            for &candidate in row {
                if excluded.insert(candidate) {
                    triples.add_triplet(instance, candidate as usize, -1.);
                }
            }
            pb.inc();
        }
        pb.finish();

        let nnz = triples.nnz();
        let rebuilt: SparseMat = triples.to_csr();
        self.core.labels.replace(rebuilt);
        info!(
            "Rebuilt shortlist with {} entries; it took {:.2}s",
            nnz,
            time::precise_time_s() - start_t
        );
        Ok(())
    }
}

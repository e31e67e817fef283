//! Worker pool for training independent trees
//!
//! Datasets depend only on the samples, so every learning unit can be fitted
//! at once. Jobs go out over a shared crossbeam queue and results come back
//! tagged with their unit index, so the assembled vector is the same as the
//! sequential one regardless of scheduling.

use crate::learn::dataset::Dataset;
use crate::learn::tree::{DecisionTree, TreeParams};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One tree to fit
#[derive(Debug, Clone)]
pub struct TrainJob {
    pub index: usize,
    /// Shared so the pool can keep a cheap backlog copy
    pub dataset: Arc<Dataset>,
    pub params: TreeParams,
}

/// Messages from workers back to the pool
#[derive(Debug)]
pub enum WorkerMessage {
    Trained { index: usize, tree: DecisionTree },
    Finished { worker_id: usize, trained: usize },
}

/// Number of threads to use for `requested` jobs over `units` units
pub fn worker_count(requested: usize, units: usize) -> usize {
    requested.min(num_cpus::get()).min(units).max(1)
}

fn run_worker(worker_id: usize, jobs: Receiver<TrainJob>, results: Sender<WorkerMessage>) {
    let mut trained = 0;
    while let Ok(job) = jobs.recv() {
        let tree = DecisionTree::fit(&job.dataset, &job.params);
        trained += 1;
        if results
            .send(WorkerMessage::Trained {
                index: job.index,
                tree,
            })
            .is_err()
        {
            return;
        }
    }
    let _ = results.send(WorkerMessage::Finished { worker_id, trained });
}

/// Fit every job, returning trees in the order of `jobs`
pub fn train_all(jobs: Vec<TrainJob>, workers: usize) -> Vec<DecisionTree> {
    let total = jobs.len();
    let workers = worker_count(workers, total);
    if workers <= 1 {
        return jobs
            .iter()
            .map(|job| DecisionTree::fit(&job.dataset, &job.params))
            .collect();
    }

    let (job_tx, job_rx) = unbounded::<TrainJob>();
    let (result_tx, result_rx) = unbounded::<WorkerMessage>();
    // kept for units a crashed worker never reported
    let backlog = jobs.clone();
    for job in jobs {
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            std::thread::spawn(move || run_worker(worker_id, jobs, results))
        })
        .collect();
    drop(result_tx);

    // unit index -> position in the job list
    let slots: BTreeMap<usize, usize> = backlog
        .iter()
        .enumerate()
        .map(|(pos, job)| (job.index, pos))
        .collect();
    let mut trees: Vec<Option<DecisionTree>> = vec![None; total];
    while let Ok(msg) = result_rx.recv() {
        match msg {
            WorkerMessage::Trained { index, tree } => {
                if let Some(&pos) = slots.get(&index) {
                    trees[pos] = Some(tree);
                }
            }
            WorkerMessage::Finished { worker_id, trained } => {
                log::debug!("learner worker {} fitted {} trees", worker_id, trained);
            }
        }
    }
    for handle in handles {
        if handle.join().is_err() {
            log::warn!("learner worker panicked, refitting its units");
        }
    }

    trees
        .into_iter()
        .zip(backlog)
        .map(|(tree, job)| tree.unwrap_or_else(|| DecisionTree::fit(&job.dataset, &job.params)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Var;
    use crate::semantics::state::Assignment;

    fn jobs() -> Vec<TrainJob> {
        let samples: Vec<Assignment> = (0..8u32)
            .map(|bits| {
                let (a, b, c) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
                Assignment::from_lits(
                    6,
                    [
                        Var(1).lit(a),
                        Var(2).lit(b),
                        Var(3).lit(c),
                        Var(4).lit(a && b),
                        Var(5).lit(b || c),
                        Var(6).lit(a ^ c),
                    ],
                )
            })
            .collect();
        (4..=6)
            .enumerate()
            .map(|(index, t)| TrainJob {
                index,
                dataset: Arc::new(Dataset::project(
                    &samples,
                    &[Var(1), Var(2), Var(3)],
                    &[Var(t)],
                )),
                params: TreeParams {
                    min_impurity_decrease: 0.0,
                    seed: 10 + index as u64,
                },
            })
            .collect()
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = train_all(jobs(), 1);
        let parallel = train_all(jobs(), 3);
        assert_eq!(sequential.len(), 3);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_sparse_unit_indices_keep_job_order() {
        // constant units produce no job, so indices skip
        let sparse: Vec<TrainJob> = jobs()
            .into_iter()
            .zip([2, 5, 9])
            .map(|(job, index)| TrainJob { index, ..job })
            .collect();
        let expected = train_all(jobs(), 1);
        assert_eq!(train_all(sparse, 3), expected);
    }

    #[test]
    fn test_job_copies_share_dataset() {
        let job = jobs().remove(0);
        let copy = job.clone();
        assert!(Arc::ptr_eq(&job.dataset, &copy.dataset));
    }

    #[test]
    fn test_worker_count_bounds() {
        assert_eq!(worker_count(8, 0), 1);
        assert_eq!(worker_count(0, 5), 1);
        assert!(worker_count(4, 2) <= 2);
    }

    #[test]
    fn test_empty_job_list() {
        assert!(train_all(Vec::new(), 4).is_empty());
    }
}

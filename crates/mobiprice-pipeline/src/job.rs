use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mobiprice_core::{CancellationToken, PhoneRecord, PriceError, PriceResult};

use crate::bundle::TrainedModelBundle;
use crate::model::Algorithm;
use crate::trainer::Trainer;

const PROGRESS_SCALE: f64 = 10_000.0;

/// Training progress in [0, 1], shared between the worker and observers.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    ticks: Arc<AtomicU32>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, fraction: f64) {
        let ticks = (fraction.clamp(0.0, 1.0) * PROGRESS_SCALE).round() as u32;
        self.ticks.store(ticks, Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        self.ticks.load(Ordering::Relaxed) as f64 / PROGRESS_SCALE
    }
}

/// A training run on a background thread.
///
/// The run is all-or-nothing: [`join`](Self::join) yields either a complete
/// bundle or an error, `Cancelled` included.
pub struct TrainingJob {
    handle: JoinHandle<PriceResult<TrainedModelBundle>>,
    cancel: CancellationToken,
    progress: ProgressTracker,
}

impl TrainingJob {
    pub fn spawn(
        trainer: Trainer,
        algorithm: Algorithm,
        dataset: Vec<PhoneRecord>,
    ) -> PriceResult<Self> {
        let cancel = CancellationToken::new();
        let progress = ProgressTracker::new();

        let worker_cancel = cancel.clone();
        let worker_progress = progress.clone();
        let handle = thread::Builder::new()
            .name(format!("mobiprice-train-{algorithm}"))
            .spawn(move || {
                trainer.train_with(algorithm, &dataset, &worker_cancel, &worker_progress)
            })
            .map_err(|e| PriceError::TrainingAborted(format!("could not start worker: {e}")))?;

        Ok(TrainingJob {
            handle,
            cancel,
            progress,
        })
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn progress(&self) -> f64 {
        self.progress.get()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and take its result.
    pub fn join(self) -> PriceResult<TrainedModelBundle> {
        self.handle
            .join()
            .map_err(|_| PriceError::TrainingAborted("training thread panicked".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use mobiprice_datasets::make_phones;

    #[test]
    fn test_progress_tracker_clamps() {
        let p = ProgressTracker::new();
        assert_eq!(p.get(), 0.0);
        p.set(0.5);
        assert_eq!(p.get(), 0.5);
        p.set(3.0);
        assert_eq!(p.get(), 1.0);
    }

    #[test]
    fn test_background_training_completes() {
        let mut config = TrainingConfig::default().with_seed(11);
        config.cv_folds = 0;
        let phones = make_phones(200, Some(11));
        let job =
            TrainingJob::spawn(Trainer::new(config), Algorithm::DecisionTree, phones).unwrap();
        let bundle = job_result(job).unwrap();
        assert_eq!(bundle.algorithm(), Algorithm::DecisionTree);
    }

    fn job_result(job: TrainingJob) -> PriceResult<TrainedModelBundle> {
        let progress = job.progress.clone();
        let bundle = job.join();
        if bundle.is_ok() {
            assert_eq!(progress.get(), 1.0);
        }
        bundle
    }

    #[test]
    fn test_cancelled_job_returns_no_bundle() {
        let mut config = TrainingConfig::default().with_seed(3);
        config.svm.epochs = 1_000_000;
        let phones = make_phones(200, Some(3));
        let job = TrainingJob::spawn(Trainer::new(config), Algorithm::Svm, phones).unwrap();
        job.cancel();
        assert_eq!(job.join().unwrap_err(), PriceError::Cancelled);
    }
}

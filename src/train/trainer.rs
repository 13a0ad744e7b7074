use crate::data::augmenters::AugmenterSet;
use crate::data::sample_store::SampleStore;
use crate::integration::checkpoint::{load_checkpoint, save_checkpoint, storage_shapes_match};
use crate::integration::serde_utils::Pairs;
use crate::nn::controller::NNController;
use crate::nn::model_builder::{build_model, ModelParams};
use crate::train::confusion::ConfusionMatrix;
use crate::train::evaluator::Evaluator;
use crate::train::metrics;
use crate::train::progress::{EpochSummary, ProgressSink};
use crate::train::results::ClassificationResults;
use crate::utils::{Array2F, Array4F, ArrayDynF, GenericResult};
use anyhow::{anyhow, bail};
use log::{info, warn};
use ndarray::{stack, Axis};
use ndarray_rand::rand::{thread_rng, RngCore};
use std::path::PathBuf;

/// Knobs of the epoch/step loop. Defaults mirror the face experiments: an
/// effectively unbounded epoch budget at a thousand steps each, evaluation after
/// every epoch.
#[derive(Clone, Debug)]
pub struct TrainOptions {
    pub mb_size: usize,
    pub nb_epochs: usize,
    pub steps_per_epoch: usize,
    pub augment_on_the_fly: bool,
    pub ckpt_path: Option<PathBuf>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            mb_size: 32,
            nb_epochs: 50_000,
            steps_per_epoch: 1000,
            augment_on_the_fly: true,
            ckpt_path: None,
        }
    }
}

/// Drives the training state machine: draws mini-batches (optionally augmented
/// per sample), applies gradient updates, checkpoints once per epoch and then
/// evaluates the full test split.
///
/// On-the-fly and offline augmentation are mutually exclusive modes: when the
/// store was expanded offline, construct the trainer with `augment_on_the_fly`
/// disabled.
pub struct Trainer {
    controller: NNController,
    store: SampleStore,
    augmenters: AugmenterSet,
    options: TrainOptions,
    binary: bool,
    class_count: usize,
    acc_history: Vec<f32>,
}

impl Trainer {
    /// Build the model from `params` and restore the checkpoint if one is
    /// configured and compatible. A missing, unreadable or shape-incompatible
    /// checkpoint falls back to fresh initialization with a warning; bad data or
    /// architecture parameters are fatal.
    pub fn new(
        params: &ModelParams,
        store: SampleStore,
        augmenters: AugmenterSet,
        options: TrainOptions,
    ) -> GenericResult<Self> {
        let blueprint = build_model(params)?;

        if store.label_width() != blueprint.output_width {
            bail!(
                "Store labels have width {} but the model produces {} outputs",
                store.label_width(),
                blueprint.output_width
            );
        }
        if options.mb_size == 0 {
            bail!("Mini-batch size must be positive");
        }
        if store.train().len() < options.mb_size {
            bail!(
                "Train split holds {} samples, fewer than the mini-batch size {}",
                store.train().len(),
                options.mb_size
            );
        }

        let fresh = NNController::new(blueprint.main_layer.clone(), blueprint.loss.clone())?;
        let controller = match &options.ckpt_path {
            Some(path) if path.exists() => match load_checkpoint(path) {
                Ok(restored) => {
                    if storage_shapes_match(&fresh.export(), &restored) {
                        info!("Restored parameters from checkpoint {:?}", path);
                        NNController::load(blueprint.main_layer, blueprint.loss, restored)?
                    } else {
                        warn!(
                            "Checkpoint {:?} does not match the architecture, starting fresh",
                            path
                        );
                        fresh
                    }
                }
                Err(e) => {
                    warn!("Failed to restore checkpoint {:?} ({}), starting fresh", path, e);
                    fresh
                }
            },
            _ => fresh,
        };

        Ok(Self {
            controller,
            store,
            augmenters,
            options,
            binary: params.binary,
            class_count: params.class_count,
            acc_history: Vec::new(),
        })
    }

    /// One gradient step on the given batch. Returns the pre-update loss and
    /// accuracy of the batch and appends the accuracy to the per-run history.
    pub fn train_on_batch(
        &mut self,
        inputs: ArrayDynF,
        expected: &ArrayDynF,
    ) -> GenericResult<(f64, f32)> {
        let (loss, output) = self.controller.train_batch(inputs, expected)?;
        let output: Array2F = output.into_dimensionality()?;
        let expected: Array2F = expected.clone().into_dimensionality()?;
        let acc = metrics::accuracy(&expected, &output, self.binary);
        self.acc_history.push(acc);
        Ok((loss, acc))
    }

    /// Uniform-random mini-batch without replacement, each sample independently
    /// augmented when on-the-fly augmentation is enabled
    fn next_training_batch(&self, rng: &mut impl RngCore) -> GenericResult<Pairs> {
        let mut batch = self.store.train().pick_rand(self.options.mb_size, rng);

        if self.options.augment_on_the_fly && !self.augmenters.is_empty() {
            let inputs: Array4F = batch.inputs.into_dimensionality()?;
            let mut augmented = Vec::with_capacity(inputs.shape()[0]);
            for image in inputs.outer_iter() {
                augmented.push(self.augmenters.apply_one(&image.to_owned(), rng));
            }
            let views: Vec<_> = augmented.iter().map(|o| o.view()).collect();
            batch.inputs = stack(Axis(0), &views)?.into_dyn();
        }

        Ok(batch)
    }

    /// Evaluate the full test split with the current parameters
    pub fn evaluate(&self) -> GenericResult<(ClassificationResults, ConfusionMatrix)> {
        let mut evaluator = Evaluator::new(
            &self.controller,
            self.options.mb_size,
            self.binary,
            self.class_count,
        );
        let results = evaluator.evaluate(self.store.test())?;
        Ok((results, evaluator.into_confusion()))
    }

    /// The epoch/step loop: train, checkpoint, evaluate, report; terminal only at
    /// the configured epoch budget. Returns the last epoch's evaluation.
    pub fn run(&mut self, sink: &mut dyn ProgressSink) -> GenericResult<ClassificationResults> {
        let mut rng = thread_rng();
        let mut last = None;

        for epoch in 0..self.options.nb_epochs {
            info!("Epoch {}/{}", epoch, self.options.nb_epochs);

            for step in 0..self.options.steps_per_epoch {
                let batch = self.next_training_batch(&mut rng)?;
                let (loss, acc) = self.train_on_batch(batch.inputs, &batch.expected)?;
                sink.on_step(
                    step,
                    self.options.steps_per_epoch,
                    loss,
                    acc,
                    self.running_mean_accuracy(),
                );
            }

            if let Some(path) = self.options.ckpt_path.clone() {
                save_checkpoint(&path, &self.controller.export())?;
            }

            let (results, _) = self.evaluate()?;
            let auc_roc = if self.binary {
                Some(results.auc_roc()?)
            } else {
                None
            };
            sink.on_epoch(
                epoch,
                &EpochSummary {
                    loss: results.loss,
                    accuracy: results.accuracy,
                    auc_roc,
                },
            );
            last = Some(results);
        }

        last.ok_or_else(|| anyhow!("A zero-epoch budget leaves nothing to report"))
    }

    /// Mean training accuracy over the most recent thousand steps
    pub fn running_mean_accuracy(&self) -> f32 {
        let window = &self.acc_history[self.acc_history.len().saturating_sub(1000)..];
        if window.is_empty() {
            return 0.0;
        }
        window.iter().sum::<f32>() / window.len() as f32
    }

    pub fn accuracy_history(&self) -> &[f32] {
        &self.acc_history
    }

    pub fn controller(&self) -> &NNController {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::progress::NullSink;
    use crate::utils::arrays_almost_equal;
    use std::env::temp_dir;
    use std::fs;

    /// Four one-hot "pixel" images, one per class, test split identical
    fn tiny_store() -> SampleStore {
        let x = Array4F::from_shape_fn((4, 1, 2, 2), |(b, _, h, w)| {
            if h * 2 + w == b {
                1.0
            } else {
                0.0
            }
        })
        .into_dyn();
        let y =
            Array2F::from_shape_fn((4, 4), |(b, c)| if b == c { 1.0 } else { 0.0 }).into_dyn();
        SampleStore::from_parts(x.clone(), y.clone(), x, y).unwrap()
    }

    fn tiny_params(lr: f32) -> ModelParams {
        ModelParams {
            input_shape: (2, 2, 1),
            class_count: 4,
            filter_counts: vec![],
            kernel_size: 3,
            dense_layers: vec![4],
            dropout_rate: 0.5,
            learning_rate: lr,
            binary: false,
        }
    }

    #[test]
    fn test_overfits_tiny_dataset_within_200_steps() {
        let options = TrainOptions {
            mb_size: 4,
            nb_epochs: 1,
            steps_per_epoch: 200,
            augment_on_the_fly: false,
            ckpt_path: None,
        };
        let mut trainer = Trainer::new(
            &tiny_params(5.0),
            tiny_store(),
            AugmenterSet::new(vec![]).unwrap(),
            options,
        )
        .unwrap();

        let results = trainer.run(&mut NullSink).unwrap();
        assert!(
            results.accuracy >= 0.99,
            "accuracy after overfit run: {}",
            results.accuracy
        );

        // Training accuracy history caught up as well
        assert!(trainer.running_mean_accuracy() > 0.5);
    }

    #[test]
    fn test_checkpoint_round_trip_restores_predictions() {
        let path = temp_dir().join(format!("face_auth_trainer_ckpt_{}.dat", std::process::id()));
        let _ = fs::remove_file(&path);

        let params = tiny_params(0.5);
        let options = TrainOptions {
            mb_size: 4,
            nb_epochs: 1,
            steps_per_epoch: 5,
            augment_on_the_fly: false,
            ckpt_path: Some(path.clone()),
        };

        let mut first = Trainer::new(
            &params,
            tiny_store(),
            AugmenterSet::new(vec![]).unwrap(),
            options.clone(),
        )
        .unwrap();
        first.run(&mut NullSink).unwrap();

        let probe = Array4F::from_shape_fn((4, 1, 2, 2), |(b, _, h, w)| {
            if h * 2 + w == b {
                1.0
            } else {
                0.0
            }
        })
        .into_dyn();
        let before = first.controller().eval_batch(probe.clone()).unwrap();

        // A fresh trainer on the same checkpoint must predict identically
        let second = Trainer::new(
            &params,
            tiny_store(),
            AugmenterSet::new(vec![]).unwrap(),
            options,
        )
        .unwrap();
        let after = second.controller().eval_batch(probe).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(arrays_almost_equal(&before, &after));
    }

    #[test]
    fn test_unreadable_checkpoint_falls_back_to_fresh_parameters() {
        let path = temp_dir().join(format!(
            "face_auth_trainer_junk_{}.dat",
            std::process::id()
        ));
        fs::write(&path, b"not a checkpoint").unwrap();

        let options = TrainOptions {
            mb_size: 4,
            nb_epochs: 1,
            steps_per_epoch: 1,
            augment_on_the_fly: false,
            ckpt_path: Some(path.clone()),
        };
        let trainer = Trainer::new(
            &tiny_params(0.5),
            tiny_store(),
            AugmenterSet::new(vec![]).unwrap(),
            options,
        );
        fs::remove_file(&path).unwrap();

        assert!(trainer.is_ok());
    }

    #[test]
    fn test_mismatched_checkpoint_falls_back_to_fresh_parameters() {
        let path = temp_dir().join(format!(
            "face_auth_trainer_mismatch_{}.dat",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        // Train and persist a 4-class model
        let options = TrainOptions {
            mb_size: 4,
            nb_epochs: 1,
            steps_per_epoch: 1,
            augment_on_the_fly: false,
            ckpt_path: Some(path.clone()),
        };
        Trainer::new(
            &tiny_params(0.5),
            tiny_store(),
            AugmenterSet::new(vec![]).unwrap(),
            options.clone(),
        )
        .unwrap()
        .run(&mut NullSink)
        .unwrap();

        // A wider architecture cannot use that checkpoint, but may start fresh
        let mut wider = tiny_params(0.5);
        wider.dense_layers = vec![8, 4];
        let trainer = Trainer::new(
            &wider,
            tiny_store(),
            AugmenterSet::new(vec![]).unwrap(),
            options,
        );
        fs::remove_file(&path).unwrap();

        assert!(trainer.is_ok());
    }

    #[test]
    fn test_batch_larger_than_train_split_is_fatal() {
        let options = TrainOptions {
            mb_size: 64,
            nb_epochs: 1,
            steps_per_epoch: 1,
            augment_on_the_fly: false,
            ckpt_path: None,
        };
        let trainer = Trainer::new(
            &tiny_params(0.5),
            tiny_store(),
            AugmenterSet::new(vec![]).unwrap(),
            options,
        );
        assert!(trainer.is_err());
    }

    #[test]
    fn test_on_the_fly_augmentation_keeps_batch_shape() {
        let options = TrainOptions {
            mb_size: 4,
            nb_epochs: 1,
            steps_per_epoch: 3,
            augment_on_the_fly: true,
            ckpt_path: None,
        };
        let mut trainer = Trainer::new(
            &tiny_params(0.5),
            tiny_store(),
            AugmenterSet::default_catalogue(),
            options,
        )
        .unwrap();

        // The run exercises pick_rand + apply_one per sample
        let results = trainer.run(&mut NullSink).unwrap();
        assert_eq!(results.pred_probs.shape(), &[4, 4]);
        assert_eq!(trainer.accuracy_history().len(), 3);
    }
}

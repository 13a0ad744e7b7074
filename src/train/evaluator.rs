use crate::integration::serde_utils::Pairs;
use crate::nn::controller::NNController;
use crate::train::confusion::ConfusionMatrix;
use crate::train::metrics;
use crate::train::results::ClassificationResults;
use crate::utils::{Array2F, GenericResult};
use ndarray::{concatenate, Axis};
use std::iter::zip;

/// Batched, read-only evaluation over a test split. Owns a confusion matrix that
/// is fresh at construction and accumulates exactly one count per evaluated
/// sample; parameters are never touched.
pub struct Evaluator<'a> {
    controller: &'a NNController,
    mb_size: usize,
    binary: bool,
    confusion: ConfusionMatrix,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        controller: &'a NNController,
        mb_size: usize,
        binary: bool,
        class_count: usize,
    ) -> Self {
        let classes = if binary { 2 } else { class_count };
        Self {
            controller,
            mb_size,
            binary,
            confusion: ConfusionMatrix::new(classes),
        }
    }

    /// Walk the split in fixed-size batches (the final batch may be short),
    /// accumulating per-batch loss and accuracy and the full ordered probability
    /// and ground-truth sequences
    pub fn evaluate(&mut self, test: &Pairs) -> GenericResult<ClassificationResults> {
        let mut losses = Vec::new();
        let mut accuracies = Vec::new();
        let mut outputs = Vec::new();
        let mut labels = Vec::new();

        for (batch_inputs, batch_labels) in test.chunks_iter(self.mb_size) {
            let batch_labels = batch_labels.to_owned();
            let (loss, output) = self
                .controller
                .test_batch(batch_inputs.to_owned(), &batch_labels)?;
            let output: Array2F = output.into_dimensionality()?;
            let batch_labels: Array2F = batch_labels.into_dimensionality()?;

            losses.push(loss);
            accuracies.push(metrics::accuracy(&batch_labels, &output, self.binary) as f64);
            for (label_row, output_row) in zip(batch_labels.outer_iter(), output.outer_iter()) {
                self.confusion.record(
                    metrics::true_class(label_row, self.binary),
                    metrics::predicted_class(output_row, self.binary),
                );
            }

            outputs.push(output);
            labels.push(batch_labels);
        }

        let batches = losses.len();
        let loss = losses.iter().sum::<f64>() / (batches.max(1)) as f64;
        let accuracy = accuracies.iter().sum::<f64>() / (batches.max(1)) as f64;

        let width = test.expected.shape()[1];
        let pred_probs = if outputs.is_empty() {
            Array2F::zeros((0, width))
        } else {
            let views: Vec<_> = outputs.iter().map(|o| o.view()).collect();
            concatenate(Axis(0), &views)?
        };
        let labels = if labels.is_empty() {
            Array2F::zeros((0, width))
        } else {
            let views: Vec<_> = labels.iter().map(|o| o.view()).collect();
            concatenate(Axis(0), &views)?
        };

        Ok(ClassificationResults {
            loss,
            accuracy,
            pred_probs,
            labels,
            binary: self.binary,
        })
    }

    pub fn confusion(&self) -> &ConfusionMatrix {
        &self.confusion
    }

    pub fn into_confusion(self) -> ConfusionMatrix {
        self.confusion
    }
}

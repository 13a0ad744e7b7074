use crate::train::metrics;
use crate::utils::{Array2F, GenericResult};
use anyhow::bail;

/// Immutable snapshot of one evaluation pass over the test split.
///
/// `pred_probs` holds one probability row per evaluated sample (a single column in
/// binary mode), `labels` the matching ground-truth rows, in evaluation order.
#[derive(Clone, Debug)]
pub struct ClassificationResults {
    pub loss: f64,
    pub accuracy: f64,
    pub pred_probs: Array2F,
    pub labels: Array2F,
    pub binary: bool,
}

impl ClassificationResults {
    /// Ground-truth flags of a binary-mode result
    pub fn binary_labels(&self) -> Vec<bool> {
        self.labels.outer_iter().map(|row| row[0] > 0.5).collect()
    }

    /// AUC-ROC computed from the recorded probabilities and labels. Only defined
    /// for binary-mode results; asking for it on a multi-class result is a caller
    /// error, not a silently wrong number.
    pub fn auc_roc(&self) -> GenericResult<f64> {
        if !self.binary {
            bail!("AUC-ROC is only meaningful for binary classification results");
        }
        let probs: Vec<f32> = self.pred_probs.outer_iter().map(|row| row[0]).collect();
        Ok(metrics::auc_roc(&probs, &self.binary_labels()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_auc_on_binary_result() {
        let results = ClassificationResults {
            loss: 0.1,
            accuracy: 1.0,
            pred_probs: array![[0.95], [0.05]],
            labels: array![[1.0], [0.0]],
            binary: true,
        };
        assert!((results.auc_roc().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_auc_on_multi_class_result_is_an_error() {
        let results = ClassificationResults {
            loss: 0.1,
            accuracy: 1.0,
            pred_probs: array![[0.9, 0.1], [0.2, 0.8]],
            labels: array![[1.0, 0.0], [0.0, 1.0]],
            binary: false,
        };
        assert!(results.auc_roc().is_err());
    }
}

use log::info;

/// Per-epoch evaluation summary handed to progress collaborators
#[derive(Clone, Debug)]
pub struct EpochSummary {
    pub loss: f64,
    pub accuracy: f64,
    pub auc_roc: Option<f64>,
}

/// Seam towards external progress displays: the trainer computes the scalars and
/// hands them off, rendering is the collaborator's business
pub trait ProgressSink {
    fn on_step(&mut self, step: usize, total_steps: usize, loss: f64, acc: f32, mean_acc: f32);

    fn on_epoch(&mut self, epoch: usize, summary: &EpochSummary);
}

/// Default sink: forwards everything to the log facade
pub struct LogSink {
    /// Emit a step line every this many steps
    pub step_interval: usize,
}

impl Default for LogSink {
    fn default() -> Self {
        Self { step_interval: 16 }
    }
}

impl ProgressSink for LogSink {
    fn on_step(&mut self, step: usize, total_steps: usize, loss: f64, acc: f32, mean_acc: f32) {
        if self.step_interval != 0 && step % self.step_interval == 0 {
            info!(
                "    {}/{} -> loss={:.8} acc={:.3} mean_acc={:.3}",
                step, total_steps, loss, acc, mean_acc
            );
        }
    }

    fn on_epoch(&mut self, epoch: usize, summary: &EpochSummary) {
        match summary.auc_roc {
            Some(auc) => info!(
                "Validation after epoch {}: loss={}, accuracy={}, auc_roc={}",
                epoch, summary.loss, summary.accuracy, auc
            ),
            None => info!(
                "Validation after epoch {}: loss={}, accuracy={}",
                epoch, summary.loss, summary.accuracy
            ),
        }
    }
}

/// Discards everything; handy for tests and headless runs
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_step(&mut self, _: usize, _: usize, _: f64, _: f32, _: f32) {}

    fn on_epoch(&mut self, _: usize, _: &EpochSummary) {}
}

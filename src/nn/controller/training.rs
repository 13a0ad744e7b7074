use crate::nn::batch_config::BatchConfig;
use crate::nn::controller::NNController;
use crate::nn::key_assigner::KeyAssigner;
use crate::nn::layers::nn_layers::*;
use crate::nn::loss::loss_func::{calc_loss, calc_loss_grad};
use crate::utils::GenericResult;
use crate::ArrayDynF;

impl NNController {
    /// Execute the following steps to train the model based on **inputs** and the
    /// corresponding labels:
    /// 1) Evaluate the model output for the given inputs (forward propagation)
    /// 2) Calculate the loss between the output and **expected**
    /// 3) Calculate the descent direction of that loss
    /// 4) Find the gradients of all parameters in all layers (backward propagation)
    /// 5) Update all parameters with those gradients (train phase)
    ///
    /// Returns the average batch loss *before* the update, together with the forward
    /// output it was computed from, so callers can derive batch accuracy without a
    /// second pass.
    pub fn train_batch(
        &mut self,
        inputs: ArrayDynF,
        expected: &ArrayDynF,
    ) -> GenericResult<(f64, ArrayDynF)> {
        let config = BatchConfig::new_train();
        let mut assigner = KeyAssigner::new();
        let mut forward_cache = GenericStorage::new();

        let output = forward_layer(
            &self.main_layer,
            ForwardData {
                inputs,
                assigner: &mut assigner,
                storage: &self.storage,
                forward_cache: &mut forward_cache,
                batch_config: &config,
            },
        )?;

        assigner.reset_keys();

        let mut backward_cache = GenericStorage::new();
        let grad = calc_loss_grad(&self.loss, expected, &output);
        let loss_mean = calc_loss(&self.loss, expected, &output)
            .mapv(|o| o as f64)
            .mean()
            .unwrap_or(0.0);

        backward_layer(
            &self.main_layer,
            BackwardData {
                grad,
                batch_config: &config,
                backward_cache: &mut backward_cache,
                forward_cache: &mut forward_cache,
                storage: &self.storage,
                assigner: &mut assigner,
            },
        )?;

        assigner.reset_keys();

        train_layer(
            &self.main_layer,
            TrainData {
                storage: &mut self.storage,
                batch_config: &config,
                assigner: &mut assigner,
                backward_cache: &mut backward_cache,
            },
        )?;

        Ok((loss_mean, output))
    }
}

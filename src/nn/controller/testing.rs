use crate::nn::batch_config::BatchConfig;
use crate::nn::controller::NNController;
use crate::nn::key_assigner::KeyAssigner;
use crate::nn::layers::nn_layers::{forward_layer, ForwardData, GenericStorage};
use crate::nn::loss::loss_func::calc_loss;
use crate::utils::GenericResult;
use crate::ArrayDynF;

impl NNController {
    /// Calculate the loss between **expected** and the result of the forward
    /// propagation of **inputs**, without updating any parameter. Returns the loss
    /// and the forward output.
    pub fn test_batch(
        &self,
        inputs: ArrayDynF,
        expected: &ArrayDynF,
    ) -> GenericResult<(f64, ArrayDynF)> {
        let config = BatchConfig::new_not_train();
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

        let loss_mean = calc_loss(&self.loss, expected, &output)
            .mapv(|o| o as f64)
            .mean()
            .unwrap_or(0.0);
        Ok((loss_mean, output))
    }
}

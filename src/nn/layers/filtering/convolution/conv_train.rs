use crate::nn::generic_storage::{get_mut_from_storage, remove_from_storage};
use crate::nn::layers::filtering::convolution::{gen_name, ConvolutionConfig, ConvolutionLayer};
use crate::nn::layers::nn_layers::{EmptyLayerResult, TrainData, TrainableLayerOps};
use crate::nn::lr_calculators::lr_calculator::{apply_lr_calc, LrCalcData};
use std::ops::AddAssign;

impl TrainableLayerOps<ConvolutionConfig> for ConvolutionLayer {
    fn train(data: TrainData, layer_config: &ConvolutionConfig) -> EmptyLayerResult {
        let TrainData {
            storage,
            backward_cache,
            assigner,
            batch_config,
        } = data;
        let key = assigner.get_key(gen_name(layer_config));

        let [kernel_grad, biases_grad] = remove_from_storage(backward_cache, &key);
        let kernel_grad = apply_lr_calc(
            &layer_config.lr_calc,
            kernel_grad,
            LrCalcData {
                batch_config,
                storage,
                assigner,
            },
        )?;
        let biases_grad = apply_lr_calc(
            &layer_config.lr_calc,
            biases_grad,
            LrCalcData {
                batch_config,
                storage,
                assigner,
            },
        )?;

        get_mut_from_storage(storage, &key, 0).add_assign(&kernel_grad);
        get_mut_from_storage(storage, &key, 1).add_assign(&biases_grad);
        Ok(())
    }
}

mod dense_backward;
mod dense_forward;

use crate::nn::generic_storage::*;
use crate::nn::layers::nn_layers::*;
use crate::nn::lr_calculators::lr_calculator::{apply_lr_calc, LrCalc, LrCalcData};
use crate::utils::{Array1F, Array2F};
use ndarray::ShapeBuilder;
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use std::ops::AddAssign;

#[derive(Clone, Debug)]
pub struct DenseConfig {
    pub out_values: usize,
    pub in_values: usize,
    pub init_mode: DenseLayerInit,
    pub weights_lr_calc: LrCalc,
    pub biases_lr_calc: LrCalc,
}

#[derive(Clone, Debug)]
pub enum DenseLayerInit {
    WeightsAndBiases(Array2F, Array1F),
    Random(),
}

pub struct DenseLayer {}

fn gen_name(config: &DenseConfig) -> String {
    format!("dense_{}_{}", config.in_values, config.out_values)
}

impl LayerOps<DenseConfig> for DenseLayer {
    fn init(data: InitData, layer_config: &DenseConfig) -> EmptyLayerResult {
        let InitData { assigner, storage } = data;
        let key = assigner.get_key(gen_name(layer_config));

        if let std::collections::hash_map::Entry::Vacant(e) = storage.entry(key) {
            let weights: Array2F;
            let biases: Array1F;

            match &layer_config.init_mode {
                DenseLayerInit::WeightsAndBiases(w, b) => {
                    weights = w.clone();
                    biases = b.clone();
                }
                DenseLayerInit::Random() => {
                    // Variance preserving init: std_dev = sqrt(2 / fan_in)
                    let std_dev = (2.0 / layer_config.in_values as f32).sqrt();
                    let dist = Normal::new(0.0, std_dev)?;
                    weights = Array2F::random(
                        (layer_config.out_values, layer_config.in_values).f(),
                        dist,
                    );
                    biases = Array1F::zeros((layer_config.out_values).f());
                }
            }

            e.insert(vec![weights.into_dyn(), biases.into_dyn()]);
        }

        Ok(())
    }

    fn forward(data: ForwardData, layer_config: &DenseConfig) -> LayerResult {
        dense_forward::forward(data, layer_config)
    }

    fn backward(data: BackwardData, layer_config: &DenseConfig) -> LayerResult {
        dense_backward::backward(data, layer_config)
    }
}

impl TrainableLayerOps<DenseConfig> for DenseLayer {
    fn train(data: TrainData, layer_config: &DenseConfig) -> EmptyLayerResult {
        let TrainData {
            backward_cache,
            assigner,
            storage,
            batch_config,
            ..
        } = data;
        let key = assigner.get_key(gen_name(layer_config));

        let [weights_grad, biases_grad] = remove_from_storage(backward_cache, &key);

        let weights_grad = apply_lr_calc(
            &layer_config.weights_lr_calc,
            weights_grad,
            LrCalcData {
                batch_config,
                storage,
                assigner,
            },
        )?;

        let biases_grad = apply_lr_calc(
            &layer_config.biases_lr_calc,
            biases_grad,
            LrCalcData {
                batch_config,
                storage,
                assigner,
            },
        )?;

        get_mut_from_storage(storage, &key, 0).add_assign(&weights_grad);
        get_mut_from_storage(storage, &key, 1).add_assign(&biases_grad);

        Ok(())
    }
}

use crate::nn::generic_storage::*;
use crate::nn::layers::nn_layers::*;
use crate::nn::lr_calculators::lr_calculator::{apply_lr_calc, LrCalc, LrCalcData};
use crate::utils::{Array1F, ArrayDynF, GenericResult};
use anyhow::bail;
use ndarray::Axis;
use std::ops::AddAssign;

pub struct BatchNormLayer;

/// Normalizes axis 1 (features of a 2D input, channels of a 4D input) over every
/// other axis. Training batches are normalized with their own statistics, which are
/// folded into the running statistics during the train phase; evaluation batches are
/// normalized with the running statistics only, so evaluation stays deterministic.
#[derive(Clone, Debug)]
pub struct BatchNormConfig {
    pub size: usize,
    pub momentum: f32,
    pub epsilon: f32,
    pub scale_lr_calc: LrCalc,
    pub shift_lr_calc: LrCalc,
}

impl BatchNormConfig {
    pub fn new(size: usize, scale_lr_calc: LrCalc, shift_lr_calc: LrCalc) -> Self {
        Self {
            size,
            momentum: 0.99,
            epsilon: 1e-5,
            scale_lr_calc,
            shift_lr_calc,
        }
    }
}

fn gen_name(config: &BatchNormConfig) -> String {
    format!("batch_norm_{}", config.size)
}

/// Mean and biased variance per feature lane
fn feature_stats(inputs: &ArrayDynF, size: usize) -> (Array1F, Array1F) {
    let mut mean = Array1F::zeros(size);
    let mut var = Array1F::zeros(size);
    for f in 0..size {
        let lane = inputs.index_axis(Axis(1), f);
        let m = lane.mean().unwrap_or(0.0);
        mean[f] = m;
        var[f] = lane.mapv(|o| (o - m) * (o - m)).mean().unwrap_or(0.0);
    }
    (mean, var)
}

/// Reshape a per-feature vector so it broadcasts along axis 1
fn spread(values: &Array1F, ndim: usize) -> GenericResult<ArrayDynF> {
    let mut shape = vec![1; ndim];
    shape[1] = values.len();
    Ok(values.clone().into_shape(shape)?)
}

impl LayerOps<BatchNormConfig> for BatchNormLayer {
    fn init(data: InitData, layer_config: &BatchNormConfig) -> EmptyLayerResult {
        let InitData { assigner, storage } = data;
        let key = assigner.get_key(gen_name(layer_config));

        if let std::collections::hash_map::Entry::Vacant(e) = storage.entry(key) {
            let size = layer_config.size;
            e.insert(vec![
                Array1F::ones(size).into_dyn(),  // scale
                Array1F::zeros(size).into_dyn(), // shift
                Array1F::zeros(size).into_dyn(), // running mean
                Array1F::ones(size).into_dyn(),  // running variance
            ]);
        }

        Ok(())
    }

    fn forward(data: ForwardData, layer_config: &BatchNormConfig) -> LayerResult {
        let ForwardData {
            inputs,
            batch_config,
            assigner,
            storage,
            forward_cache,
            ..
        } = data;
        let key = assigner.get_key(gen_name(layer_config));

        if inputs.ndim() < 2 || inputs.shape()[1] != layer_config.size {
            bail!(
                "Batch norm of size {} got input of shape {:?}",
                layer_config.size,
                inputs.shape()
            );
        }

        let [scale, shift, running_mean, running_var] = clone_from_storage(storage, &key);
        let scale: Array1F = scale.into_dimensionality()?;
        let shift: Array1F = shift.into_dimensionality()?;
        let ndim = inputs.ndim();
        let scale_b = spread(&scale, ndim)?;
        let shift_b = spread(&shift, ndim)?;
        let epsilon = layer_config.epsilon;

        if batch_config.is_training {
            let (mean, var) = feature_stats(&inputs, layer_config.size);
            let inv_std = var.mapv(|v| 1.0 / (v + epsilon).sqrt());
            let x_hat = (&inputs - &spread(&mean, ndim)?) * &spread(&inv_std, ndim)?;
            let result = &x_hat * &scale_b + &shift_b;

            forward_cache.insert(
                key,
                vec![
                    x_hat,
                    inv_std.into_dyn(),
                    mean.into_dyn(),
                    var.into_dyn(),
                ],
            );
            Ok(result)
        } else {
            let running_mean: Array1F = running_mean.into_dimensionality()?;
            let running_var: Array1F = running_var.into_dimensionality()?;
            let inv_std = running_var.mapv(|v| 1.0 / (v + epsilon).sqrt());
            let x_hat = (&inputs - &spread(&running_mean, ndim)?) * &spread(&inv_std, ndim)?;
            Ok(&x_hat * &scale_b + &shift_b)
        }
    }

    fn backward(data: BackwardData, layer_config: &BatchNormConfig) -> LayerResult {
        let BackwardData {
            grad,
            assigner,
            storage,
            forward_cache,
            backward_cache,
            ..
        } = data;
        let key = assigner.get_key(gen_name(layer_config));

        let [x_hat, inv_std, mean, var] = remove_from_storage(forward_cache, &key);
        let [scale] = clone_from_storage(storage, &key);
        let scale: Array1F = scale.into_dimensionality()?;
        let inv_std_1: Array1F = inv_std.into_dimensionality()?;

        let size = layer_config.size;
        let ndim = grad.ndim();
        let lane_len = (grad.len() / size) as f32;

        let mut scale_grad = Array1F::zeros(size);
        let mut shift_grad = Array1F::zeros(size);
        let mut sum_g = Array1F::zeros(size);
        let mut sum_gx = Array1F::zeros(size);
        for f in 0..size {
            let g_lane = grad.index_axis(Axis(1), f);
            let x_lane = x_hat.index_axis(Axis(1), f);
            let g_sum: f32 = g_lane.sum();
            let gx_sum: f32 = (&g_lane * &x_lane).sum();
            sum_g[f] = g_sum;
            sum_gx[f] = gx_sum;
            shift_grad[f] = g_sum / lane_len;
            scale_grad[f] = gx_sum / lane_len;
        }

        // dx = scale * inv_std / m * (m*g - sum_g - x_hat * sum_gx)
        let factor = spread(&(&scale * &inv_std_1), ndim)? / lane_len;
        let centered = grad * lane_len - &spread(&sum_g, ndim)? - &x_hat * &spread(&sum_gx, ndim)?;
        let result = centered * &factor;

        backward_cache.insert(
            key,
            vec![scale_grad.into_dyn(), shift_grad.into_dyn(), mean, var],
        );
        Ok(result)
    }
}

impl TrainableLayerOps<BatchNormConfig> for BatchNormLayer {
    fn train(data: TrainData, layer_config: &BatchNormConfig) -> EmptyLayerResult {
        let TrainData {
            backward_cache,
            assigner,
            storage,
            batch_config,
            ..
        } = data;
        let key = assigner.get_key(gen_name(layer_config));

        let [scale_grad, shift_grad, batch_mean, batch_var] =
            remove_from_storage(backward_cache, &key);

        let scale_grad = apply_lr_calc(
            &layer_config.scale_lr_calc,
            scale_grad,
            LrCalcData {
                batch_config,
                storage,
                assigner,
            },
        )?;
        let shift_grad = apply_lr_calc(
            &layer_config.shift_lr_calc,
            shift_grad,
            LrCalcData {
                batch_config,
                storage,
                assigner,
            },
        )?;

        get_mut_from_storage(storage, &key, 0).add_assign(&scale_grad);
        get_mut_from_storage(storage, &key, 1).add_assign(&shift_grad);

        let momentum = layer_config.momentum;
        get_mut_from_storage(storage, &key, 2).zip_mut_with(&batch_mean, |r, b| {
            *r = *r * momentum + b * (1.0 - momentum)
        });
        get_mut_from_storage(storage, &key, 3).zip_mut_with(&batch_var, |r, b| {
            *r = *r * momentum + b * (1.0 - momentum)
        });

        Ok(())
    }
}

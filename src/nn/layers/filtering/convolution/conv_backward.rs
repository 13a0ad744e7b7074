use crate::nn::generic_storage::{clone_from_storage, remove_from_storage};
use crate::nn::layers::filtering::convolution::{gen_name, ConvolutionConfig};
use crate::nn::layers::filtering::{pad4d, remove_padding_4d};
use crate::nn::layers::nn_layers::{BackwardData, LayerResult};
use crate::utils::{get_dims_after_filter_4, Array2F, Array4F, Array5F};
use ndarray::parallel::prelude::*;
use ndarray::{s, stack, Axis};
use std::ops::AddAssign;

pub fn backward(data: BackwardData, layer_config: &ConvolutionConfig) -> LayerResult {
    let BackwardData {
        assigner,
        forward_cache,
        storage,
        grad,
        backward_cache,
        ..
    } = data;

    let key = assigner.get_key(gen_name(layer_config));

    let [kernel] = clone_from_storage(storage, &key);
    let kernel: Array4F = kernel.into_dimensionality()?;

    let [inputs] = remove_from_storage(forward_cache, &key);
    let inputs: Array4F = inputs.into_dimensionality()?;
    let inputs = pad4d(inputs, layer_config.padding);

    let grad: Array4F = grad.into_dimensionality()?;

    let kernels_grad = calc_kernel_grad(&inputs, &grad, layer_config);
    let biases_grad = grad
        .sum_axis(Axis(3))
        .sum_axis(Axis(2))
        .mean_axis(Axis(0))
        .unwrap();
    backward_cache.insert(
        key,
        vec![kernels_grad.into_dyn(), biases_grad.into_dyn()],
    );

    let inputs_grad = cpu_inputs_grad(inputs, grad, kernel, layer_config);

    Ok(inputs_grad.into_dyn())
}

/// Batch mean of the correlation between the gradient and the input window each
/// kernel element saw
pub fn calc_kernel_grad(
    inputs: &Array4F,
    grad: &Array4F,
    layer_config: &ConvolutionConfig,
) -> Array4F {
    let ConvolutionConfig {
        in_channels,
        out_channels,
        kernel_size,
        stride,
        ..
    } = layer_config;
    let kernel_size = *kernel_size;
    let stride = *stride;

    let shape = inputs.shape();
    let batch = shape[0] as f32;
    let height = shape[2];
    let width = shape[3];

    let mut parts = Vec::with_capacity(kernel_size * kernel_size);
    (0..kernel_size * kernel_size)
        .into_par_iter()
        .with_min_len(1)
        .map(|o| (o / kernel_size, o % kernel_size))
        .map(|(kh, kw)| {
            let affected = inputs.slice(s![
                ..,
                ..,
                kh..height - (kernel_size - kh - 1); stride,
                kw..width - (kernel_size - kw - 1); stride
            ]);
            Array2F::from_shape_fn((*out_channels, *in_channels), |(och, ich)| {
                let g = grad.slice(s![.., och, .., ..]);
                let a = affected.slice(s![.., ich, .., ..]);
                (&g * &a).sum() / batch
            })
        })
        .collect_into_vec(&mut parts);

    let mut views = Vec::with_capacity(parts.len());
    views.extend(parts.iter().map(|o| o.view()));

    let joined = stack(Axis(2), &views).unwrap();
    joined
        .into_shape((*out_channels, *in_channels, kernel_size, kernel_size))
        .unwrap()
}

pub fn cpu_inputs_grad(
    inputs: Array4F,
    grad: Array4F,
    kernel: Array4F,
    layer_config: &ConvolutionConfig,
) -> Array4F {
    let inputs_shape = inputs.shape().to_vec();
    let ConvolutionConfig {
        kernel_size,
        stride,
        padding,
        ..
    } = layer_config;

    // Put height and width in front
    let grad = grad.permuted_axes((2, 3, 0, 1));
    let kernel = kernel.permuted_axes((1, 2, 3, 0));
    let kernel = kernel.insert_axis(Axis(3));

    let [batch_size, in_channels, new_height, new_width] =
        get_dims_after_filter_4(&inputs_shape, *kernel_size, *stride);

    let mut parts = Vec::with_capacity(new_height * new_width);
    (0..(new_height * new_width))
        .into_par_iter()
        .map(|o| (o / new_width, o % new_width))
        .map(|(h, w)| {
            let current_grad = grad.slice(s![h, w, .., ..]);
            let batch_mul: Array5F = &kernel * &current_grad;
            let batch_sum = batch_mul.sum_axis(Axis(4));
            batch_sum.permuted_axes((3, 0, 1, 2))
        })
        .collect_into_vec(&mut parts);

    let mut padded_result =
        Array4F::zeros((batch_size, in_channels, inputs_shape[2], inputs_shape[3]));
    parts.into_iter().enumerate().for_each(|(i, arr)| {
        let h = i / new_width;
        let w = i % new_width;
        let h_offset = h * stride;
        let w_offset = w * stride;
        padded_result
            .slice_mut(s![
                ..,
                ..,
                h_offset..(h_offset + kernel_size),
                w_offset..(w_offset + kernel_size)
            ])
            .add_assign(&arr);
    });

    remove_padding_4d(padded_result, *padding)
}

use crate::nn::generic_storage::clone_from_storage;
use crate::nn::layers::filtering::convolution::{gen_name, ConvolutionConfig};
use crate::nn::layers::filtering::pad4d;
use crate::nn::layers::nn_layers::{ForwardData, LayerResult};
use crate::utils::{get_dims_after_filter_4, Array1F, Array3F, Array4F, GenericResult};
use ndarray::parallel::prelude::*;
use ndarray::{s, stack, ArrayView3, ArrayViewMut3, Axis};

pub fn forward(data: ForwardData, layer_config: &ConvolutionConfig) -> LayerResult {
    let ForwardData {
        inputs,
        storage,
        assigner,
        forward_cache,
        ..
    } = data;
    let key = assigner.get_key(gen_name(layer_config));

    let inputs: Array4F = inputs.into_dimensionality()?;

    let [kernel, biases] = clone_from_storage(storage, &key);
    let kernel: Array4F = kernel.into_dimensionality()?;
    let biases: Array1F = biases.into_dimensionality()?;

    let result = cpu_forward(&inputs, &kernel, &biases, layer_config)?;

    forward_cache.insert(key, vec![inputs.into_dyn()]);
    Ok(result.into_dyn())
}

pub fn cpu_forward(
    inputs: &Array4F,
    kernel: &Array4F,
    biases: &Array1F,
    layer_config: &ConvolutionConfig,
) -> GenericResult<Array4F> {
    let ConvolutionConfig {
        stride,
        kernel_size,
        ..
    } = layer_config;
    let inputs = pad4d(inputs.clone(), layer_config.padding);

    let [batch, _, new_height, new_width] =
        get_dims_after_filter_4(inputs.shape(), *kernel_size, *stride);
    let biases = biases
        .clone()
        .insert_axis(Axis(1))
        .insert_axis(Axis(2));

    let mut batches = Vec::with_capacity(batch);
    inputs
        .outer_iter()
        .into_par_iter()
        .map(|inputs| {
            let mut result = Array3F::zeros((layer_config.out_channels, new_height, new_width));
            for h in 0..new_height {
                for w in 0..new_width {
                    apply_conv_filter(
                        kernel,
                        stride,
                        kernel_size,
                        &inputs,
                        &mut result.view_mut(),
                        h,
                        w,
                    );
                }
            }
            result + &biases
        })
        .collect_into_vec(&mut batches);

    let mut views = Vec::with_capacity(batch);
    views.extend(batches.iter().map(|o| o.view()));
    Ok(stack(Axis(0), &views)?)
}

fn apply_conv_filter(
    kernel: &Array4F,
    stride: &usize,
    kernel_size: &usize,
    inputs: &ArrayView3<f32>,
    result: &mut ArrayViewMut3<f32>,
    h: usize,
    w: usize,
) {
    let h_offset = h * stride;
    let w_offset = w * stride;
    let area = inputs.slice(s![
        ..,
        h_offset..(h_offset + kernel_size),
        w_offset..(w_offset + kernel_size)
    ]);
    let area = area.insert_axis(Axis(0));
    let out: Array4F = &area * kernel;

    out.outer_iter()
        .map(|o| o.sum())
        .enumerate()
        .for_each(|(index, o)| result[(index, h, w)] = o);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::batch_config::BatchConfig;
    use crate::nn::key_assigner::KeyAssigner;
    use crate::nn::layers::filtering::convolution::tests::{get_config, get_kernel};
    use crate::nn::layers::nn_layers::{GenericStorage, InitData, LayerOps};
    use crate::nn::layers::filtering::convolution::ConvolutionLayer;
    use crate::utils::arrays_almost_equal;

    fn get_inputs() -> Array4F {
        Array4F::from_shape_fn((1, 1, 4, 4), |(_, _, h, w)| (h * 4 + w + 1) as f32)
    }

    #[test]
    fn test_forward() {
        let config = get_config();
        let mut storage = GenericStorage::new();
        ConvolutionLayer::init(
            InitData {
                assigner: &mut KeyAssigner::new(),
                storage: &mut storage,
            },
            &config,
        )
        .unwrap();

        let mut forward_cache = GenericStorage::new();
        let result = forward(
            ForwardData {
                inputs: get_inputs().into_dyn(),
                forward_cache: &mut forward_cache,
                storage: &storage,
                assigner: &mut KeyAssigner::new(),
                batch_config: &BatchConfig::new_train(),
            },
            &config,
        )
        .unwrap();

        // Channel 0 sums every 3x3 window, channel 1 picks the center plus its bias
        let expected: Array4F = Array4F::from_shape_vec(
            (1, 2, 2, 2),
            vec![54.0, 63.0, 90.0, 99.0, 6.5, 7.5, 10.5, 11.5],
        )
        .unwrap();

        assert!(arrays_almost_equal(
            &expected,
            &result.into_dimensionality().unwrap()
        ));
    }

    #[test]
    fn test_forward_same_padding_keeps_dims() {
        let mut config = get_config();
        config.padding = 1;

        let biases = Array1F::zeros(2);
        let result = cpu_forward(&get_inputs(), &get_kernel(), &biases, &config).unwrap();
        assert_eq!(result.shape(), &[1, 2, 4, 4]);
        // Top-left window hangs over the zero padding
        assert!((result[(0, 0, 0, 0)] - 14.0).abs() < 0.001);
        assert!((result[(0, 1, 0, 0)] - 1.0).abs() < 0.001);
    }
}

use crate::nn::layers::filtering::max_pool::{gen_name, MaxPoolConfig};
use crate::nn::layers::filtering::pad4d;
use crate::nn::layers::nn_layers::{ForwardData, LayerResult};
use crate::utils::{get_dims_after_filter_4, Array4F};
use ndarray::s;

pub fn forward(data: ForwardData, layer_config: &MaxPoolConfig) -> LayerResult {
    let ForwardData {
        inputs,
        forward_cache,
        assigner,
        ..
    } = data;

    let key = assigner.get_key(gen_name());
    forward_cache.insert(key, vec![inputs.clone()]);

    let inputs: Array4F = inputs.into_dimensionality()?;
    let result = forward_cpu(
        inputs,
        layer_config.size,
        layer_config.stride,
        layer_config.padding,
    );
    Ok(result.into_dyn())
}

fn forward_cpu(inputs: Array4F, size: usize, stride: usize, padding: usize) -> Array4F {
    let inputs = pad4d(inputs, padding);
    let [batch_size, channels, new_height, new_width] =
        get_dims_after_filter_4(inputs.shape(), size, stride);

    Array4F::from_shape_fn(
        (batch_size, channels, new_height, new_width),
        |(b, c, h, w)| {
            let h_offset = h * stride;
            let w_offset = w * stride;
            let area = inputs.slice(s![
                b,
                c,
                h_offset..(h_offset + size),
                w_offset..(w_offset + size)
            ]);
            area.into_iter().copied().reduce(f32::max).unwrap_or(0.0)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::batch_config::BatchConfig;
    use crate::nn::key_assigner::KeyAssigner;
    use crate::nn::layers::filtering::max_pool::tests::{create_forward_outputs, create_inputs};
    use crate::nn::layers::nn_layers::GenericStorage;
    use crate::utils::ArrayDynF;

    #[test]
    fn test_forward_2x2() {
        let inputs = create_inputs();
        let expected = create_forward_outputs();

        fn action(inputs: ArrayDynF, size: usize, stride: usize) -> ArrayDynF {
            forward(
                ForwardData {
                    inputs,
                    batch_config: &BatchConfig::new_train(),
                    assigner: &mut KeyAssigner::new(),
                    storage: &GenericStorage::new(),
                    forward_cache: &mut GenericStorage::new(),
                },
                &MaxPoolConfig {
                    size,
                    stride,
                    padding: 0,
                },
            )
            .unwrap()
        }

        assert_eq!(expected, action(inputs, 2, 2));
    }

    #[test]
    fn test_forward_halves_spatial_dims() {
        let inputs = Array4F::zeros((3, 2, 8, 6)).into_dyn();
        let result = forward(
            ForwardData {
                inputs,
                batch_config: &BatchConfig::new_train(),
                assigner: &mut KeyAssigner::new(),
                storage: &GenericStorage::new(),
                forward_cache: &mut GenericStorage::new(),
            },
            &MaxPoolConfig {
                size: 2,
                stride: 2,
                padding: 0,
            },
        )
        .unwrap();
        assert_eq!(result.shape(), &[3, 2, 4, 3]);
    }
}

use crate::nn::layers::filtering::convolution::{gen_name, ConvolutionConfig, ConvolutionInitMode};
use crate::nn::layers::nn_layers::{EmptyLayerResult, InitData};
use crate::utils::{Array1F, Array4F};
use ndarray::{ErrorKind, ShapeError};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;

pub fn init(data: InitData, layer_config: &ConvolutionConfig) -> EmptyLayerResult {
    let InitData { assigner, storage } = data;
    let ConvolutionConfig {
        in_channels,
        out_channels,
        kernel_size,
        init_mode,
        ..
    } = layer_config.clone();
    let key = assigner.get_key(gen_name(layer_config));

    if let std::collections::hash_map::Entry::Vacant(e) = storage.entry(key) {
        let (kernel, biases) = match init_mode {
            ConvolutionInitMode::KernelAndBiases(k, b) => {
                let shape = k.shape();
                if shape[0] != out_channels
                    || shape[1] != in_channels
                    || shape[2] != kernel_size
                    || shape[3] != kernel_size
                    || b.len() != out_channels
                {
                    return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
                }
                (k, b)
            }
            ConvolutionInitMode::HeNormal() => {
                let fan_in = in_channels * kernel_size * kernel_size;
                let std_dev = (2.0 / fan_in as f32).sqrt();
                let dist = Normal::new(0.0, std_dev)?;
                (
                    Array4F::random((out_channels, in_channels, kernel_size, kernel_size), dist),
                    Array1F::zeros(out_channels),
                )
            }
        };

        e.insert(vec![kernel.into_dyn(), biases.into_dyn()]);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::key_assigner::KeyAssigner;
    use crate::nn::layers::filtering::convolution::ConvolutionInitMode::HeNormal;
    use crate::nn::layers::nn_layers::GenericStorage;
    use crate::nn::lr_calculators::constant_lr::ConstantLrConfig;
    use crate::nn::lr_calculators::lr_calculator::LrCalc;

    #[test]
    fn test_init() {
        let config = ConvolutionConfig {
            in_channels: 1,
            out_channels: 4,
            kernel_size: 3,
            stride: 1,
            padding: 0,
            init_mode: HeNormal(),
            lr_calc: LrCalc::Constant(ConstantLrConfig::default()),
        };

        let mut assigner = KeyAssigner::new();
        let mut storage = GenericStorage::new();
        let data = InitData {
            assigner: &mut assigner,
            storage: &mut storage,
        };
        init(data, &config).unwrap();

        let stored = &storage["convolution_1_4_0"];
        assert_eq!(stored[0].shape(), &[4, 1, 3, 3]);
        assert_eq!(stored[1].shape(), &[4]);
        assert!(stored[1].iter().all(|o| *o == 0.0));
    }

    #[test]
    fn test_init_rejects_wrong_kernel_shape() {
        let config = ConvolutionConfig {
            in_channels: 2,
            out_channels: 4,
            kernel_size: 3,
            stride: 1,
            padding: 0,
            init_mode: ConvolutionInitMode::KernelAndBiases(
                Array4F::zeros((4, 1, 3, 3)),
                Array1F::zeros(4),
            ),
            lr_calc: LrCalc::Constant(ConstantLrConfig::default()),
        };

        let mut assigner = KeyAssigner::new();
        let mut storage = GenericStorage::new();
        let result = init(
            InitData {
                assigner: &mut assigner,
                storage: &mut storage,
            },
            &config,
        );
        assert!(result.is_err());
    }
}

use crate::nn::layers::nn_layers::LayerResult;
use crate::nn::lr_calculators::lr_calculator::{LrCalcData, LrCalcOps};
use crate::utils::ArrayDynF;

#[derive(Clone, Debug)]
pub struct ConstantLrConfig {
    pub lr: f32,
}

impl Default for ConstantLrConfig {
    fn default() -> Self {
        Self { lr: 0.005 }
    }
}

pub struct ConstantLr {}

impl LrCalcOps<ConstantLrConfig> for ConstantLr {
    fn apply(target: ArrayDynF, _: LrCalcData, config: &ConstantLrConfig) -> LayerResult {
        Ok(target * config.lr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::batch_config::BatchConfig;
    use crate::nn::key_assigner::KeyAssigner;
    use crate::nn::layers::nn_layers::GenericStorage;
    use crate::utils::arrays_almost_equal;
    use ndarray::array;

    #[test]
    fn test_apply_scales_by_rate() {
        let target = array![1.0, -2.0, 4.0].into_dyn();
        let result = ConstantLr::apply(
            target,
            LrCalcData {
                batch_config: &BatchConfig::new_train(),
                assigner: &mut KeyAssigner::new(),
                storage: &mut GenericStorage::new(),
            },
            &ConstantLrConfig { lr: 0.5 },
        )
        .unwrap();
        assert!(arrays_almost_equal(
            &result,
            &array![0.5, -1.0, 2.0].into_dyn()
        ));
    }
}

use crate::nn::generic_storage::remove_from_storage;
use crate::nn::layers::nn_layers::*;

pub struct LeakyReluLayer;

#[derive(Clone, Debug)]
pub struct LeakyReluConfig {
    pub negative_slope: f32,
}

impl Default for LeakyReluConfig {
    fn default() -> Self {
        Self {
            negative_slope: 0.2,
        }
    }
}

fn gen_name() -> String {
    "leaky_relu".to_owned()
}

impl LayerOps<LeakyReluConfig> for LeakyReluLayer {
    fn init(_: InitData, _: &LeakyReluConfig) -> EmptyLayerResult {
        Ok(())
    }

    fn forward(data: ForwardData, layer_config: &LeakyReluConfig) -> LayerResult {
        let ForwardData {
            assigner,
            forward_cache,
            inputs,
            ..
        } = data;
        let key = assigner.get_key(gen_name());
        let slope = layer_config.negative_slope;

        forward_cache.insert(key, vec![inputs.clone()]);
        Ok(inputs.mapv_into(|o| if o > 0.0 { o } else { o * slope }))
    }

    fn backward(data: BackwardData, layer_config: &LeakyReluConfig) -> LayerResult {
        let BackwardData {
            assigner,
            forward_cache,
            grad,
            ..
        } = data;
        let key = assigner.get_key(gen_name());
        let slope = layer_config.negative_slope;

        let [cache] = remove_from_storage(forward_cache, &key);
        Ok(grad * cache.mapv_into(|o| if o > 0.0 { 1.0 } else { slope }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::batch_config::BatchConfig;
    use crate::nn::key_assigner::KeyAssigner;
    use crate::utils::arrays_almost_equal;
    use ndarray::array;

    #[test]
    fn test_forward_backward() {
        let inputs = array![[2.0, -1.0, 0.0, -10.0]].into_dyn();
        let config = LeakyReluConfig::default();

        let mut forward_cache = GenericStorage::new();
        let mut assigner = KeyAssigner::new();
        let result = LeakyReluLayer::forward(
            ForwardData {
                inputs,
                batch_config: &BatchConfig::new_train(),
                assigner: &mut assigner,
                storage: &GenericStorage::new(),
                forward_cache: &mut forward_cache,
            },
            &config,
        )
        .unwrap();
        assert!(arrays_almost_equal(
            &result,
            &array![[2.0, -0.2, 0.0, -2.0]].into_dyn()
        ));

        assigner.reset_keys();
        let grad = array![[1.0, 1.0, 1.0, 2.0]].into_dyn();
        let back = LeakyReluLayer::backward(
            BackwardData {
                grad,
                batch_config: &BatchConfig::new_train(),
                assigner: &mut assigner,
                storage: &GenericStorage::new(),
                forward_cache: &mut forward_cache,
                backward_cache: &mut GenericStorage::new(),
            },
            &config,
        )
        .unwrap();
        assert!(arrays_almost_equal(
            &back,
            &array![[1.0, 0.2, 0.2, 0.4]].into_dyn()
        ));
    }
}

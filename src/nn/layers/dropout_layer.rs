use crate::nn::layers::nn_layers::*;
use crate::utils::Array1F;
use ndarray_rand::RandomExt;

pub struct DropoutLayer;

#[derive(Clone, Debug)]
pub struct DropoutConfig {
    pub drop: f32,
}

fn gen_name(config: &DropoutConfig) -> String {
    format!("dropout_{}", config.drop)
}

impl LayerOps<DropoutConfig> for DropoutLayer {
    fn init(_: InitData, _: &DropoutConfig) -> EmptyLayerResult {
        Ok(())
    }

    fn forward(data: ForwardData, layer_config: &DropoutConfig) -> LayerResult {
        let ForwardData {
            forward_cache,
            assigner,
            inputs,
            batch_config,
            ..
        } = data;
        let key = assigner.get_key(gen_name(layer_config));

        if batch_config.is_training {
            // Only perform dropout while training. Survivors are scaled up so the
            // evaluation pass needs no compensation.
            let factor = layer_config.drop;
            let keep_scale = 1.0 / (1.0 - factor);
            let length = inputs
                .shape()
                .iter()
                .copied()
                .reduce(|acc, val| acc * val)
                .unwrap_or(1);
            let dist = ndarray_rand::rand_distr::Uniform::new(0.0, 1.0);
            let dropout = Array1F::random(length, &dist)
                .mapv_into(|o| if o < factor { 0.0 } else { keep_scale })
                .into_shape(inputs.shape())?;

            let result = inputs * &dropout;
            forward_cache.insert(key, vec![dropout]);
            Ok(result)
        } else {
            forward_cache.insert(key, vec![]);
            Ok(inputs)
        }
    }

    fn backward(data: BackwardData, layer_config: &DropoutConfig) -> LayerResult {
        let BackwardData {
            forward_cache,
            assigner,
            grad,
            ..
        } = data;
        let key = assigner.get_key(gen_name(layer_config));
        match forward_cache[&key].as_slice() {
            [dropout] => Ok(grad * dropout),
            _ => Ok(grad),
        }
    }
}

use crate::nn::layers::nn_layers::*;

#[derive(Clone, Debug)]
pub struct SequentialConfig {
    pub layers: Vec<Layer>,
}

pub struct SequentialLayer {}

impl LayerOps<SequentialConfig> for SequentialLayer {
    fn init(data: InitData, layer_config: &SequentialConfig) -> EmptyLayerResult {
        for layer in layer_config.layers.iter() {
            init_layer(
                layer,
                InitData {
                    assigner: &mut *data.assigner,
                    storage: &mut *data.storage,
                },
            )?;
        }
        Ok(())
    }

    fn forward(data: ForwardData, layer_config: &SequentialConfig) -> LayerResult {
        let mut inputs = data.inputs;

        for layer in layer_config.layers.iter() {
            let layer_data = ForwardData {
                inputs,
                assigner: &mut *data.assigner,
                forward_cache: &mut *data.forward_cache,
                storage: data.storage,
                batch_config: data.batch_config,
            };
            inputs = forward_layer(layer, layer_data)?;
        }
        Ok(inputs)
    }

    fn backward(data: BackwardData, layer_config: &SequentialConfig) -> LayerResult {
        let mut grad = data.grad;
        for layer in layer_config.layers.iter().rev() {
            let layer_data = BackwardData {
                grad,
                assigner: &mut *data.assigner,
                forward_cache: &mut *data.forward_cache,
                backward_cache: &mut *data.backward_cache,
                batch_config: data.batch_config,
                storage: data.storage,
            };
            grad = backward_layer(layer, layer_data)?;
        }
        Ok(grad)
    }
}

impl TrainableLayerOps<SequentialConfig> for SequentialLayer {
    fn train(data: TrainData, layer_config: &SequentialConfig) -> EmptyLayerResult {
        for layer in layer_config.layers.iter() {
            let train_data = TrainData {
                storage: &mut *data.storage,
                batch_config: data.batch_config,
                assigner: &mut *data.assigner,
                backward_cache: &mut *data.backward_cache,
            };
            train_layer(layer, train_data)?;
        }
        Ok(())
    }
}

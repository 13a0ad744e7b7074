use crate::nn::generic_storage::remove_from_storage;
use crate::nn::layers::nn_layers::*;

pub struct SigmoidLayer {}

fn gen_name() -> String {
    "sigmoid".to_owned()
}

impl LayerOps<()> for SigmoidLayer {
    fn init(_: InitData, _: &()) -> EmptyLayerResult {
        Ok(())
    }

    fn forward(data: ForwardData, _: &()) -> LayerResult {
        let ForwardData {
            assigner,
            forward_cache,
            inputs,
            ..
        } = data;
        let key = assigner.get_key(gen_name());
        let result = 1.0 / (1.0 + (-inputs).mapv_into(f32::exp));
        forward_cache.insert(key, vec![result.clone()]);
        Ok(result)
    }

    fn backward(data: BackwardData, _: &()) -> LayerResult {
        let BackwardData {
            assigner,
            forward_cache,
            grad,
            ..
        } = data;
        let key = assigner.get_key(gen_name());
        let [cache] = remove_from_storage(forward_cache, &key);
        Ok(grad * &cache * (1.0 - &cache))
    }
}

use crate::nn::generic_storage::remove_from_storage;
use crate::nn::layers::nn_layers::*;
use crate::utils::Array2F;
use ndarray::Axis;

/// Row-wise softmax. The output of this layer is a probability distribution per sample,
/// which is what the evaluation protocol records and the cross entropy loss consumes.
pub struct SoftmaxLayer {}

fn gen_name() -> String {
    "softmax".to_owned()
}

fn softmax(array: Array2F) -> Array2F {
    let mut e = array;
    e.outer_iter_mut().for_each(|mut row| {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|o| (o - max).exp());
        let sum: f32 = row.iter().sum();
        row.iter_mut().for_each(|o| *o /= sum);
    });
    e
}

impl LayerOps<()> for SoftmaxLayer {
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
        let result = softmax(inputs.into_dimensionality()?);
        let result = result.into_dyn();
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
        let probs: Array2F = cache.into_dimensionality()?;
        let grad: Array2F = grad.into_dimensionality()?;

        // Jacobian application per row: p * (g - <g, p>)
        let dot = (&grad * &probs).sum_axis(Axis(1)).insert_axis(Axis(1));
        let result = &probs * &(grad - dot);
        Ok(result.into_dyn())
    }
}

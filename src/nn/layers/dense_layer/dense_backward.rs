use crate::nn::generic_storage::*;
use crate::nn::layers::dense_layer::{gen_name, DenseConfig};
use crate::nn::layers::nn_layers::*;
use crate::utils::Array2F;
use ndarray::parallel::prelude::*;
use ndarray::{stack, Axis, Zip};

/// Calculates the weights' error as the batch mean of the outer product between the gradient
/// and the inputs, and the biases' error as the batch mean of the gradient.
/// Outputs the matrix multiplication between the gradient and the weights.
pub fn backward(data: BackwardData, layer_config: &DenseConfig) -> LayerResult {
    let BackwardData {
        assigner,
        storage,
        forward_cache,
        grad,
        backward_cache,
        ..
    } = data;
    let key = assigner.get_key(gen_name(layer_config));

    let [weights] = clone_from_storage(storage, &key);
    let weights: Array2F = weights.into_dimensionality()?;

    let [inputs] = remove_from_storage(forward_cache, &key);
    let inputs: Array2F = inputs.into_dimensionality()?;

    let grad: Array2F = grad.into_dimensionality()?;

    let batches = inputs.shape()[0];
    let factor = 1.0 / batches as f32;

    let weights_error = Zip::from(inputs.outer_iter())
        .and(grad.outer_iter())
        .into_par_iter()
        .map(|(i, g)| {
            let gt = g.insert_axis(Axis(1));
            let it = i.insert_axis(Axis(0));
            gt.dot(&it)
        })
        .map(|o| o * factor)
        .reduce(
            || Array2F::default((layer_config.out_values, layer_config.in_values)),
            |acc, val| acc + val,
        );

    let biases_grad = grad.mean_axis(Axis(0)).unwrap().into_dyn();

    let weights_grad = weights_error.into_dyn();
    backward_cache.insert(key, vec![weights_grad, biases_grad]);

    let weights_t = weights.t();
    let mut dot_prod = Vec::with_capacity(batches);
    grad.outer_iter()
        .into_par_iter()
        .map(|o| weights_t.dot(&o))
        .collect_into_vec(&mut dot_prod);

    let mut views = Vec::with_capacity(batches);
    views.extend(dot_prod.iter().map(|o| o.view()));
    Ok(stack(Axis(0), &views)?.into_dyn())
}

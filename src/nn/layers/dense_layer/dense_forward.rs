use crate::nn::generic_storage::clone_from_storage;
use crate::nn::layers::dense_layer::*;
use crate::nn::layers::nn_layers::*;
use crate::utils::{Array1F, Array2F};
use ndarray::parallel::prelude::*;
use ndarray::{stack, Axis};

pub fn forward(data: ForwardData, layer_config: &DenseConfig) -> LayerResult {
    let ForwardData {
        assigner,
        storage,
        inputs,
        forward_cache,
        ..
    } = data;
    let key = assigner.get_key(gen_name(layer_config));

    let [weights, biases] = clone_from_storage(storage, &key);
    let weights: Array2F = weights.into_dimensionality()?;
    let biases: &Array1F = &biases.into_dimensionality()?;

    let inputs: Array2F = inputs.into_dimensionality()?;
    let batch_size = inputs.shape()[0];

    let mut dot_prod = Vec::with_capacity(batch_size);
    inputs
        .outer_iter()
        .into_par_iter()
        .map(|o| weights.dot(&o))
        .map(|o| o + biases)
        .collect_into_vec(&mut dot_prod);

    let mut views = Vec::with_capacity(batch_size);
    views.extend(dot_prod.iter().map(|o| o.view()));

    let result = stack(Axis(0), &views)?;

    forward_cache.insert(key, vec![inputs.into_dyn()]);
    Ok(result.into_dyn())
}

use crate::nn::batch_config::BatchConfig;
use crate::nn::key_assigner::KeyAssigner;
use crate::nn::layers::activation::*;
use crate::nn::layers::filtering::convolution::{self, ConvolutionConfig};
use crate::nn::layers::filtering::max_pool::{self, MaxPoolConfig};
use crate::nn::layers::*;
use crate::utils::{ArrayDynF, GenericResult};
use std::collections::HashMap;

/// Enum to represent the layers that create the model and its parameters
#[derive(Clone, Debug)]
pub enum Layer {
    /// Dense Layer: perform matrix multiplication between the input and a weights matrix, and add
    /// a biases vector.
    /// ### Trainable
    /// * Weights
    /// * Biases
    Dense(dense_layer::DenseConfig),

    /// Executes the layers in sequential order, passing the output of a layer as the input
    /// of the next layer. Will probably be the **root** of the model.
    Sequential(sequential_layer::SequentialConfig),

    /// Apply the sigmoid activation function. Used as the classification head in binary mode.
    Sigmoid,

    /// Normalize each row into a probability distribution. Used as the classification head in
    /// multi-class mode.
    Softmax,

    /// Rectify the input, letting a small fraction of negative values through instead of
    /// clamping them to zero.
    LeakyRelu(leaky_relu_layer::LeakyReluConfig),

    /// Normalize the input per feature (2D) or per channel (4D) using batch statistics while
    /// training and running statistics during evaluation.
    /// ### Trainable
    /// * Scale
    /// * Shift
    BatchNorm(batch_norm_layer::BatchNormConfig),

    /// Apply the convolution operation with 2D filters over the last two dimensions of the
    /// input, adding a per-output-channel bias. Requires a 4 dimensional input (one being
    /// the batch).
    /// ### Trainable
    /// * Kernel
    /// * Biases
    Convolution(ConvolutionConfig),

    /// Apply MAX operation with 2D filters over the last two dimensions of the input.
    /// Use for reducing the size of arrays after **Convolution**.
    MaxPool(MaxPoolConfig),

    /// Flattens all dimensions except the batch. The result will always be a 2D array. Useful for
    /// passing **Convolution** results into **Dense** layers.
    Flatten,

    /// Randomly nullifies a percentage of the inputs while training, scaling the survivors so
    /// evaluation needs no compensation. Useful for avoiding overfitting.
    Dropout(dropout_layer::DropoutConfig),
}

pub struct InitData<'a> {
    pub assigner: &'a mut KeyAssigner,
    pub storage: &'a mut GenericStorage,
}

pub struct ForwardData<'a> {
    pub inputs: ArrayDynF,
    pub batch_config: &'a BatchConfig,
    pub assigner: &'a mut KeyAssigner,
    pub storage: &'a GenericStorage,
    pub forward_cache: &'a mut GenericStorage,
}

pub struct BackwardData<'a> {
    pub grad: ArrayDynF,
    pub batch_config: &'a BatchConfig,
    pub assigner: &'a mut KeyAssigner,
    pub storage: &'a GenericStorage,
    pub forward_cache: &'a mut GenericStorage,
    pub backward_cache: &'a mut GenericStorage,
}

pub struct TrainData<'a> {
    pub batch_config: &'a BatchConfig,
    pub assigner: &'a mut KeyAssigner,
    pub storage: &'a mut GenericStorage,
    pub backward_cache: &'a mut GenericStorage,
}

/// Type alias for a map on which layers store all the needed data.
/// Key: unique string for a layer
/// Value: Vector of NDimensional arrays
/// The purpose of this type is to provide a centralized storage for trainable parameters
/// as opposed to the object oriented approach where layers are classes that store parameters
/// as fields. The advantage is that it can be easily serialized, and most of the time, layers
/// can be added or removed without progress loss
pub type GenericStorage = HashMap<String, Vec<ArrayDynF>>;

pub type EmptyLayerResult = GenericResult<()>;
pub type LayerResult = GenericResult<ArrayDynF>;

pub trait LayerOps<T> {
    fn init(data: InitData, layer_config: &T) -> EmptyLayerResult;

    fn forward(data: ForwardData, layer_config: &T) -> LayerResult;

    fn backward(data: BackwardData, layer_config: &T) -> LayerResult;
}

pub trait TrainableLayerOps<T> {
    fn train(data: TrainData, layer_config: &T) -> EmptyLayerResult;
}

/// Call **init** in the appropriate layer. Not intended to be called directly.
pub fn init_layer(layer: &Layer, data: InitData) -> EmptyLayerResult {
    use Layer::*;
    match layer {
        Dense(c) => dense_layer::DenseLayer::init(data, c),
        Sequential(c) => sequential_layer::SequentialLayer::init(data, c),
        Sigmoid => sigmoid_layer::SigmoidLayer::init(data, &()),
        Softmax => softmax_layer::SoftmaxLayer::init(data, &()),
        LeakyRelu(c) => leaky_relu_layer::LeakyReluLayer::init(data, c),
        BatchNorm(c) => batch_norm_layer::BatchNormLayer::init(data, c),
        Convolution(c) => convolution::ConvolutionLayer::init(data, c),
        MaxPool(c) => max_pool::MaxPoolLayer::init(data, c),
        Flatten => flatten_layer::FlattenLayer::init(data, &()),
        Dropout(c) => dropout_layer::DropoutLayer::init(data, c),
    }
}

/// Call **forward** in the appropriate layer. Not intended to be called directly.
pub fn forward_layer(layer: &Layer, data: ForwardData) -> LayerResult {
    use Layer::*;
    match layer {
        Dense(c) => dense_layer::DenseLayer::forward(data, c),
        Sequential(c) => sequential_layer::SequentialLayer::forward(data, c),
        Sigmoid => sigmoid_layer::SigmoidLayer::forward(data, &()),
        Softmax => softmax_layer::SoftmaxLayer::forward(data, &()),
        LeakyRelu(c) => leaky_relu_layer::LeakyReluLayer::forward(data, c),
        BatchNorm(c) => batch_norm_layer::BatchNormLayer::forward(data, c),
        Convolution(c) => convolution::ConvolutionLayer::forward(data, c),
        MaxPool(c) => max_pool::MaxPoolLayer::forward(data, c),
        Flatten => flatten_layer::FlattenLayer::forward(data, &()),
        Dropout(c) => dropout_layer::DropoutLayer::forward(data, c),
    }
}

/// Call **backward** in the appropriate layer. Not intended to be called directly.
pub fn backward_layer(layer: &Layer, data: BackwardData) -> LayerResult {
    use Layer::*;
    match layer {
        Dense(c) => dense_layer::DenseLayer::backward(data, c),
        Sequential(c) => sequential_layer::SequentialLayer::backward(data, c),
        Sigmoid => sigmoid_layer::SigmoidLayer::backward(data, &()),
        Softmax => softmax_layer::SoftmaxLayer::backward(data, &()),
        LeakyRelu(c) => leaky_relu_layer::LeakyReluLayer::backward(data, c),
        BatchNorm(c) => batch_norm_layer::BatchNormLayer::backward(data, c),
        Convolution(c) => convolution::ConvolutionLayer::backward(data, c),
        MaxPool(c) => max_pool::MaxPoolLayer::backward(data, c),
        Flatten => flatten_layer::FlattenLayer::backward(data, &()),
        Dropout(c) => dropout_layer::DropoutLayer::backward(data, c),
    }
}

/// Call **train** in the appropriate layer. If the layer doesn't provide an implementation,
/// nothing will happen. Not intended to be called directly.
pub fn train_layer(layer: &Layer, data: TrainData) -> EmptyLayerResult {
    use Layer::*;
    match layer {
        Dense(c) => dense_layer::DenseLayer::train(data, c),
        Sequential(c) => sequential_layer::SequentialLayer::train(data, c),
        Convolution(c) => convolution::ConvolutionLayer::train(data, c),
        BatchNorm(c) => batch_norm_layer::BatchNormLayer::train(data, c),
        _ => Ok(()),
    }
}

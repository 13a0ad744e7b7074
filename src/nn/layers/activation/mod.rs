pub mod leaky_relu_layer;
pub mod sigmoid_layer;
pub mod softmax_layer;

use crate::nn::layers::activation::leaky_relu_layer::LeakyReluConfig;
use crate::nn::layers::batch_norm_layer::BatchNormConfig;
use crate::nn::layers::dense_layer::{DenseConfig, DenseLayerInit};
use crate::nn::layers::dropout_layer::DropoutConfig;
use crate::nn::layers::filtering::convolution::{ConvolutionConfig, ConvolutionInitMode};
use crate::nn::layers::filtering::max_pool::MaxPoolConfig;
use crate::nn::layers::nn_layers::Layer;
use crate::nn::layers::sequential_layer::SequentialConfig;
use crate::nn::loss::loss_func::LossFunc;
use crate::nn::lr_calculators::constant_lr::ConstantLrConfig;
use crate::nn::lr_calculators::lr_calculator::LrCalc;
use crate::utils::GenericResult;
use anyhow::bail;

/// Hyper-parameters describing a classifier architecture.
///
/// `input_shape` is `(height, width, channels)` of a single sample. Every entry in
/// `filter_counts` becomes a batch-norm + same-padding convolution + 2x2 max-pool
/// stage (halving the spatial dimensions); every entry of `dense_layers` except the
/// last becomes a batch-norm + affine + leaky-relu + dropout stage. The final stage
/// is the classification head: an affine map to one output with a sigmoid in binary
/// mode, or to `class_count` outputs with a softmax otherwise.
#[derive(Clone, Debug)]
pub struct ModelParams {
    pub input_shape: (usize, usize, usize),
    pub class_count: usize,
    pub filter_counts: Vec<usize>,
    pub kernel_size: usize,
    pub dense_layers: Vec<usize>,
    pub dropout_rate: f32,
    pub learning_rate: f32,
    pub binary: bool,
}

/// Immutable description of a fully assembled model. Layer containers are built in
/// one pass here, so no partially constructed model is ever observable.
pub struct ModelBlueprint {
    pub main_layer: Layer,
    pub loss: LossFunc,
    pub output_width: usize,
}

pub fn build_model(params: &ModelParams) -> GenericResult<ModelBlueprint> {
    let (height, width, channels) = params.input_shape;
    if height == 0 || width == 0 || channels == 0 {
        bail!("Input shape {:?} has an empty dimension", params.input_shape);
    }
    if !params.filter_counts.is_empty() && params.kernel_size % 2 == 0 {
        bail!(
            "Kernel size must be odd so same-padding stays symmetric, got {}",
            params.kernel_size
        );
    }
    if params.dense_layers.is_empty() {
        bail!("At least the final classification stage must be listed in dense_layers");
    }
    if !params.binary && params.class_count < 2 {
        bail!(
            "Multi-class models need at least 2 classes, got {}",
            params.class_count
        );
    }
    if !(0.0..1.0).contains(&params.dropout_rate) {
        bail!("Dropout rate must lie in [0, 1), got {}", params.dropout_rate);
    }

    let lr = || {
        LrCalc::Constant(ConstantLrConfig {
            lr: params.learning_rate,
        })
    };

    let mut layers = Vec::new();
    let (mut channels, mut height, mut width) = (channels, height, width);

    for (stage, &filters) in params.filter_counts.iter().enumerate() {
        if filters == 0 {
            bail!("Convolutional stage {} has zero filters", stage);
        }
        if height < 2 || width < 2 {
            bail!(
                "Convolutional stage {} would pool a {}x{} signal down to nothing",
                stage,
                height,
                width
            );
        }

        layers.push(Layer::BatchNorm(BatchNormConfig::new(channels, lr(), lr())));
        layers.push(Layer::Convolution(ConvolutionConfig {
            in_channels: channels,
            out_channels: filters,
            kernel_size: params.kernel_size,
            stride: 1,
            padding: (params.kernel_size - 1) / 2,
            init_mode: ConvolutionInitMode::HeNormal(),
            lr_calc: lr(),
        }));
        layers.push(Layer::MaxPool(MaxPoolConfig {
            size: 2,
            stride: 2,
            padding: 0,
        }));

        channels = filters;
        height = (height - 2) / 2 + 1;
        width = (width - 2) / 2 + 1;
    }

    layers.push(Layer::Flatten);
    let mut features = channels * height * width;

    let hidden = &params.dense_layers[..params.dense_layers.len() - 1];
    for &neurons in hidden {
        if neurons == 0 {
            bail!("Dense stages need at least one neuron");
        }
        layers.push(Layer::BatchNorm(BatchNormConfig::new(features, lr(), lr())));
        layers.push(Layer::Dense(DenseConfig {
            in_values: features,
            out_values: neurons,
            init_mode: DenseLayerInit::Random(),
            weights_lr_calc: lr(),
            biases_lr_calc: lr(),
        }));
        layers.push(Layer::LeakyRelu(LeakyReluConfig::default()));
        layers.push(Layer::Dropout(DropoutConfig {
            drop: params.dropout_rate,
        }));
        features = neurons;
    }

    let output_width = if params.binary { 1 } else { params.class_count };
    layers.push(Layer::Dense(DenseConfig {
        in_values: features,
        out_values: output_width,
        init_mode: DenseLayerInit::Random(),
        weights_lr_calc: lr(),
        biases_lr_calc: lr(),
    }));
    let (head, loss) = if params.binary {
        (Layer::Sigmoid, LossFunc::LogLoss)
    } else {
        (Layer::Softmax, LossFunc::CrossEntropy)
    };
    layers.push(head);

    Ok(ModelBlueprint {
        main_layer: Layer::Sequential(SequentialConfig { layers }),
        loss,
        output_width,
    })
}

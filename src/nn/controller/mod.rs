mod evaluating;
mod testing;
mod training;

use crate::nn::key_assigner::KeyAssigner;
use crate::nn::layers::nn_layers::*;
use crate::nn::loss::loss_func::LossFunc;
use crate::utils::GenericResult;

/// Main struct to train and use a model: owns the layer tree, the parameter
/// storage and the loss function. The trainer is the only caller that mutates
/// parameters (through `train_batch`); evaluation passes only read them.
pub struct NNController {
    main_layer: Layer,
    storage: GenericStorage,
    loss: LossFunc,
}

impl NNController {
    /// Create a controller with an empty storage and init its layers
    pub fn new(main_layer: Layer, loss: LossFunc) -> GenericResult<Self> {
        let mut storage = GenericStorage::new();
        let mut assigner = KeyAssigner::new();
        init_layer(
            &main_layer,
            InitData {
                assigner: &mut assigner,
                storage: &mut storage,
            },
        )?;

        Ok(Self {
            main_layer,
            storage,
            loss,
        })
    }

    /// Create a controller with the provided storage and init its layers. Layers
    /// whose parameters are already present keep them, so passing a restored
    /// checkpoint storage resumes from the persisted state.
    pub fn load(
        main_layer: Layer,
        loss: LossFunc,
        mut storage: GenericStorage,
    ) -> GenericResult<Self> {
        let mut assigner = KeyAssigner::new();
        init_layer(
            &main_layer,
            InitData {
                assigner: &mut assigner,
                storage: &mut storage,
            },
        )?;

        Ok(Self {
            main_layer,
            storage,
            loss,
        })
    }

    /// Return a copy of the inner storage
    pub fn export(&self) -> GenericStorage {
        self.storage.clone()
    }
}

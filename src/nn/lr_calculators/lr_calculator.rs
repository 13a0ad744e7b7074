use crate::nn::batch_config::BatchConfig;
use crate::nn::key_assigner::KeyAssigner;
use crate::nn::layers::nn_layers::{GenericStorage, LayerResult};
use crate::nn::lr_calculators::constant_lr::{ConstantLr, ConstantLrConfig};
use crate::utils::ArrayDynF;

pub struct LrCalcData<'a> {
    pub batch_config: &'a BatchConfig,
    pub assigner: &'a mut KeyAssigner,
    pub storage: &'a mut GenericStorage,
}

/// The seam between raw parameter gradients and the update actually applied.
/// The engine trains with plain gradient descent at a fixed rate.
#[derive(Clone, Debug)]
pub enum LrCalc {
    Constant(ConstantLrConfig),
}

pub trait LrCalcOps<T> {
    fn apply(target: ArrayDynF, data: LrCalcData, config: &T) -> LayerResult;
}

pub fn apply_lr_calc(calc: &LrCalc, target: ArrayDynF, data: LrCalcData) -> LayerResult {
    match calc {
        LrCalc::Constant(c) => ConstantLr::apply(target, data, c),
    }
}

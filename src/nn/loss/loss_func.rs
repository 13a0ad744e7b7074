use crate::nn::loss::cross_entropy_loss::CrossEntropyLoss;
use crate::nn::loss::log_loss::LogLossFunc;
use crate::utils::ArrayDynF;

pub trait LossFuncOps {
    fn calc_loss(expected: &ArrayDynF, actual: &ArrayDynF) -> ArrayDynF;

    /// Returns the *descent direction* (the negated loss gradient), so layers can
    /// add their scaled gradients during the train phase
    fn calc_loss_grad(expected: &ArrayDynF, actual: &ArrayDynF) -> ArrayDynF;
}

/// The model's classification head already produces probabilities (sigmoid or
/// softmax), so both loss functions operate on probability inputs.
#[derive(Clone, Debug)]
pub enum LossFunc {
    /// Element-wise binary cross entropy. Pairs with a sigmoid head.
    LogLoss,
    /// One-hot cross entropy. Pairs with a softmax head.
    CrossEntropy,
}

pub fn calc_loss(loss: &LossFunc, expected: &ArrayDynF, actual: &ArrayDynF) -> ArrayDynF {
    use LossFunc::*;
    match loss {
        LogLoss => LogLossFunc::calc_loss(expected, actual),
        CrossEntropy => CrossEntropyLoss::calc_loss(expected, actual),
    }
}

pub fn calc_loss_grad(loss: &LossFunc, expected: &ArrayDynF, actual: &ArrayDynF) -> ArrayDynF {
    use LossFunc::*;
    match loss {
        LogLoss => LogLossFunc::calc_loss_grad(expected, actual),
        CrossEntropy => CrossEntropyLoss::calc_loss_grad(expected, actual),
    }
}

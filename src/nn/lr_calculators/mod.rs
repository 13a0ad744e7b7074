pub mod constant_lr;
pub mod lr_calculator;

pub mod batch_config;
pub mod controller;
pub mod generic_storage;
pub mod key_assigner;
pub mod layers;
pub mod loss;
pub mod lr_calculators;
pub mod model_builder;

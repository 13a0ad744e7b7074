pub mod checkpoint;
pub mod deserialization;
pub mod experiment_loading;
pub mod random_picker;
pub mod serde_utils;
pub mod serialization;

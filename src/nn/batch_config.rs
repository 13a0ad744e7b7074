/// Simple struct that carries per-batch information down the layer tree
pub struct BatchConfig {
    pub is_training: bool,
}

impl BatchConfig {
    pub fn new_not_train() -> Self {
        Self { is_training: false }
    }

    pub fn new_train() -> Self {
        Self { is_training: true }
    }
}

pub mod cross_entropy_loss;
pub mod log_loss;
pub mod loss_func;

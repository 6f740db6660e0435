//! Dense networks and optimizers (CPU-only training and inference).

pub mod dense;
pub mod optimizer;

pub use dense::{Activation, DenseLayer, DenseNetwork, LayerGradient};
pub use optimizer::Adam;

//! Neural Network Architectures
//!
//! Q-value approximators for value-based learning.

pub mod q_network;

pub use q_network::{QFunction, QNetwork};

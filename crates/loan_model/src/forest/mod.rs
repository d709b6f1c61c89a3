//! Random-forest classifier for loan approval
//!
//! - Trees are plain node arrays with `<=` threshold comparison
//! - Prediction is a deterministic majority vote
//! - Serialization goes through canonical JSON so models hash reproducibly

pub mod model;
pub mod tree;

pub use model::{RandomForest, FOREST_VERSION};
pub use tree::{Node, Tree};

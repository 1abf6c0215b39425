pub mod render;
pub mod snapshot;
pub mod tree_model;

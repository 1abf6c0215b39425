pub mod builder;
pub mod extract;
pub mod plan_model;

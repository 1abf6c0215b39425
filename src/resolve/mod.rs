pub mod criteria;
pub mod resolver;

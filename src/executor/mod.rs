pub mod executor;
pub mod result;
pub mod settle;

pub mod keys;
pub mod rotate;

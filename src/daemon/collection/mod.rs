pub mod collector;
pub mod sample;

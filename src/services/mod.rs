pub mod gateway;
pub mod key_generator;
pub mod staging;

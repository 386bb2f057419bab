pub mod facade;
pub mod synthetic;

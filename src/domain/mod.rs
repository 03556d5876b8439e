pub mod models;
pub mod peripherals;
pub mod settings;

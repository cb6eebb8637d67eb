pub mod config;
pub mod emit;
pub mod model;
pub mod mysql;
pub mod pipeline;
pub mod wordpress;

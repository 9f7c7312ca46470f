pub mod advisor;
pub mod aggregate;
pub mod engine;
pub mod generator;
pub mod query;

pub mod clock;
pub mod compression;
pub mod constants;
pub mod data_handle;
pub mod engine;
pub mod error;
pub mod format;
pub mod generator;
pub mod index;
pub mod loader;
pub mod normalizer;
pub mod projector;
pub mod scheduler;
pub mod service;
pub mod trim;

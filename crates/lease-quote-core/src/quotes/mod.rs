pub mod engine;
pub mod grid;
pub mod options;
pub mod sources;

/// Chunk and merge command construction on top of an [`engine::EncodeEngine`].
pub mod adapter;
/// The command-driven encode engine contract.
pub mod engine;
/// System `ffmpeg` engine.
pub mod ffmpeg;
/// In-memory engine for tests and dry runs.
pub mod memory;
/// Dedicated engine worker thread with request/response correlation.
pub mod worker;

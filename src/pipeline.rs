/// Percentage and ETA aggregation.
pub mod progress;
/// Chunk planning and the per-chunk render/encode pairing.
pub mod segmenter;
/// The export state machine.
pub mod session;

pub mod estimator;
#[cfg_attr(not(feature = "camera-nokhwa"), allow(dead_code))]
pub mod rgba_converter;
pub mod session;
pub mod skeleton;
pub mod source;

// Re-exports for convenience
pub use estimator::{InferenceRunner, OrtEngine, OrtEngineConfig};
pub use session::{Interrupt, LoopOutcome, Session, StopReason};
pub use source::{SourceError, SourceSpec, open_source};

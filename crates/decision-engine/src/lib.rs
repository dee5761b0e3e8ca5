//! Risk Decision Engine
//!
//! Composes feature assembly, classification, the alert policy and
//! persistence into one decision per request.

mod engine;
mod error;

pub use engine::{DecisionEngine, DecisionResult, DecisionStage};
pub use error::{EngineError, ErrorKind};

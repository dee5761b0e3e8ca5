//! Feature Assembly Engine
//!
//! Turns caller-supplied health fields and a resolved air-quality reading into
//! the fixed-order feature vector the risk classifier was trained on.

mod coerce;
mod error;
mod features;

pub use coerce::{coerce_int, parse_int};
pub use error::FeatureError;
pub use features::{
    AqiReading, FeatureAssembler, FeatureVector, HealthInputs, DEFAULT_AGE, FEATURE_DIMENSION,
    FEATURE_NAMES,
};

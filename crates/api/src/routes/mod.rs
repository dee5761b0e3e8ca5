//! HTTP route handlers

pub mod alerts;
pub mod aqi;
pub mod predict;
pub mod predictions;

/// Upper bound on any history page
pub(crate) const MAX_LIMIT: usize = 500;

pub(crate) fn default_limit() -> usize {
    50
}

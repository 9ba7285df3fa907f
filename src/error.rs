//! Application-wide error types.

use thiserror::Error;

use crate::interpolate::InterpolationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error("logger error: {0}")]
    Logger(String),
}

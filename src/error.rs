use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("vehicle has already landed, reset it before running again")]
    AlreadyLanded,
    #[error("evaluation needs at least one trial")]
    NoTrials,
    #[error("run thread panicked")]
    RunPanicked,
    #[error("scenario error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] json::Error),
}

pub(crate) fn require(name: &'static str, value: f64, valid: bool) -> Result<f64, Error> {
    if valid && value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}

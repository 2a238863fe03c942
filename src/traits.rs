use crate::status::{LampColor, OperatingMode, ServerStatus};
use std::sync::Arc;
use thiserror::Error;

/// Failure of a single request to the signal controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never completed (connect, timeout, I/O).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The controller answered but refused the command. Carries its body text.
    #[error("rejected by controller: {0}")]
    Rejected(String),

    /// The controller answered with a payload we could not decode.
    #[error("malformed response: {0}")]
    Malformed(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg_attr(test, mockall::automock)]
pub trait ControllerApi {
    /// Fetch the current authoritative status snapshot.
    fn poll(&self) -> ApiResult<ServerStatus>;

    fn set_mode(&self, mode: OperatingMode) -> ApiResult<()>;

    /// Send new green/yellow durations in whole seconds.
    fn set_timing(&self, green_s: u32, yellow_s: u32) -> ApiResult<()>;

    fn set_lamp(&self, lamp_id: u32, color: LampColor) -> ApiResult<()>;
}

impl<T: ControllerApi + ?Sized> ControllerApi for Arc<T> {
    fn poll(&self) -> ApiResult<ServerStatus> {
        (**self).poll()
    }

    fn set_mode(&self, mode: OperatingMode) -> ApiResult<()> {
        (**self).set_mode(mode)
    }

    fn set_timing(&self, green_s: u32, yellow_s: u32) -> ApiResult<()> {
        (**self).set_timing(green_s, yellow_s)
    }

    fn set_lamp(&self, lamp_id: u32, color: LampColor) -> ApiResult<()> {
        (**self).set_lamp(lamp_id, color)
    }
}

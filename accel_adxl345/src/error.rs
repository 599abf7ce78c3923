use crate::{command::Command, config::Protocol};
use core::result::Result as CoreResult;
use thiserror::Error;

pub type Result<T> = CoreResult<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Range {0} is not in range of accepted values: 2, 4, 8, 16")]
    InvalidRange(u32),
    #[error("Sample interval of {value}us is outside of device bounds [{min}us, {max}us]")]
    SampleDtOutOfRange { value: u32, min: u32, max: u32 },
    #[error("Sample rate should be a positive number of Hz, got {0}")]
    InvalidSampleRate(f64),
    #[error("Recording duration should be a finite, non-negative number of seconds, got {0}")]
    InvalidDuration(f64),
    #[error("Acquisition already finished, its samples were returned")]
    AcquisitionFinished,
    #[error("Could not parse recieved data correctly: {0}")]
    InvalidData(String),
    #[error("Binary sample stream is out of sync, got checksum byte {0:#04x}")]
    OutOfSync(u8),
    #[error("Device did not respond before read timeout")]
    NoResponse,
    #[error("Recieved an unexpected type of response")]
    UnexpectedResponse,
    #[error("{0:?} is not supported by {1} protocol")]
    Unsupported(Command, Protocol),

    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

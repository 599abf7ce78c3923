//! Driver for ADXL345 based accelerometer boards talking a small text protocol over a serial
//! link. Commands are bracketed ids, `[5]\n` or `[4,16]\n`, queries are answered with a line of
//! text and samples are streamed either as text lines or as packed binary records, depending on
//! firmware revision.

pub mod accel;
pub mod acquisition;
pub mod command;
pub mod config;
pub mod error;
pub mod io_adapter;
pub mod response;

pub use accel::{Accelerometer, StreamState};
pub use acquisition::{duration_to_count, Acquisition, AcquisitionStatus};
pub use command::Command;
pub use config::{AccelConf, DrainStrategy, MalformedPolicy, Protocol, Range, ACCEL_SCALE};
pub use error::Error;
#[cfg(feature = "serial")]
pub use io_adapter::serial::SerialAdapter;
pub use io_adapter::IoAdapter;
pub use response::{RawSample, Reply, Sample, SampleBatch};

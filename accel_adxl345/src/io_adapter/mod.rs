#[cfg(feature = "serial")]
pub mod serial;

use crate::{accel::Accelerometer, config::AccelConf, error::Result};

/// Byte level access to the link the sensor board is connected over
pub trait IoAdapter {
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
    /// Reads whatever is available, returns 0 if the read timed out
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    /// Amount of bytes that can be read without waiting
    fn bytes_to_read(&mut self) -> Result<usize>;
    /// Discards everything in the input buffer
    fn clear_input(&mut self) -> Result<()>;

    fn open_accelerometer(self, conf: &AccelConf) -> Result<Accelerometer<Self>>
    where
        Self: Sized,
    {
        Accelerometer::connect(self, conf)
    }
}

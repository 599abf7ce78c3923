use super::IoAdapter;
use crate::{config::AccelConf, error::Result};
use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};

pub struct SerialAdapter {
    port: Box<dyn SerialPort>,
}

impl IoAdapter for SerialAdapter {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(count) => Ok(count),
            Err(err) if err.kind() == ErrorKind::TimedOut => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    fn bytes_to_read(&mut self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn clear_input(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

impl SerialAdapter {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        SerialAdapter { port }
    }

    /// Opens the port named in `conf` with its baud rate and read timeout
    pub fn open(conf: &AccelConf) -> Result<Self> {
        log::debug!("Opening {} at {} baud", conf.port, conf.baud_rate);
        let port = serialport::new(&conf.port, conf.baud_rate)
            .timeout(conf.timeout)
            .open()?;
        Ok(SerialAdapter::new(port))
    }
}

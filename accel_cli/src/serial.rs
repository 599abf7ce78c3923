use accel_adxl345::{
    config::{DEFAULT_BAUD_RATE, DEFAULT_RESET_DELAY},
    AccelConf, Accelerometer, IoAdapter, MalformedPolicy, Protocol, SerialAdapter,
};
use clap::Args;
use simple_eyre::{eyre::WrapErr, Result};
use std::time::Duration;

#[derive(Args)]
pub struct SerialConf {
    /// Name of serial port that should be used
    #[clap(short, long, value_parser)]
    pub serial: String,

    #[clap(long, value_parser, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    /// How long a read waits for data, in milliseconds
    #[clap(long, value_parser, default_value_t = 300)]
    pub timeout_ms: u64,

    /// Wire format of the firmware: space-text, comma-text or binary
    #[clap(long, value_parser, default_value = "comma-text")]
    pub protocol: Protocol,

    /// Measurement range in g applied on connect, one of 2, 4, 8 or 16
    #[clap(long, value_parser, default_value_t = 16)]
    pub range: u32,

    /// Skip waiting for the board to reboot after the port is opened
    #[clap(long)]
    pub no_reset_wait: bool,

    /// Fail on malformed text samples instead of dropping them
    #[clap(long)]
    pub strict: bool,
}

pub type SerialAccel = Accelerometer<SerialAdapter>;

impl SerialConf {
    pub fn accel_conf(&self) -> AccelConf {
        AccelConf {
            port: self.serial.clone(),
            baud_rate: self.baud_rate,
            timeout: Duration::from_millis(self.timeout_ms),
            range: self.range,
            reset_delay: (!self.no_reset_wait).then_some(DEFAULT_RESET_DELAY),
            protocol: self.protocol,
            malformed: if self.strict {
                MalformedPolicy::Fail
            } else {
                MalformedPolicy::Drop
            },
            ..Default::default()
        }
    }

    pub fn open_accelerometer(&self) -> Result<SerialAccel> {
        let conf = self.accel_conf();
        let adapter = SerialAdapter::open(&conf)
            .wrap_err_with(|| format!("Could not open serial port {}", self.serial))?;
        let accel = adapter
            .open_accelerometer(&conf)
            .wrap_err("Could not connect to accelerometer")?;
        Ok(accel)
    }
}

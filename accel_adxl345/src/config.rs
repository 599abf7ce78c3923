use crate::{command::Command, error::Error};
use core::{
    fmt,
    fmt::{Debug, Display},
    str::FromStr,
    time::Duration,
};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

/// Converts a raw count into acceleration, same factor for every range setting
pub const ACCEL_SCALE: f64 = 0.0384431560448;

/// Full scale measurement range in g
#[derive(ToPrimitive, FromPrimitive, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Range {
    G2 = 2,
    G4 = 4,
    G8 = 8,
    #[default]
    G16 = 16,
}

impl Range {
    pub const ALL: [Range; 4] = [Range::G2, Range::G4, Range::G8, Range::G16];

    pub fn as_g(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Range {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Range::from_u32(value).ok_or(Error::InvalidRange(value))
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}", *self as u32))
    }
}

/// Wire format used by a firmware revision while streaming
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Protocol {
    /// Whitespace separated fields, `;` between samples
    SpaceText,
    /// Comma separated fields, `;` between samples
    #[default]
    CommaText,
    /// Packed 7 byte records: x, y, z as little-endian i16 followed by a zero checksum byte
    Binary,
}

impl Protocol {
    /// Field delimiter used in text replies and text samples
    pub fn delimiter(self) -> char {
        match self {
            Protocol::SpaceText => ' ',
            Protocol::CommaText | Protocol::Binary => ',',
        }
    }

    /// Checks if firmware speaking this protocol knows the command
    pub fn supports(self, cmd: &Command) -> bool {
        match cmd {
            Command::GetBadSampleCount => self == Protocol::Binary,
            _ => true,
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::SpaceText => "space-text",
            Protocol::CommaText => "comma-text",
            Protocol::Binary => "binary",
        })
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "space-text" => Ok(Protocol::SpaceText),
            "comma-text" => Ok(Protocol::CommaText),
            "binary" => Ok(Protocol::Binary),
            _ => Err(Error::InvalidData(format!("Unknown protocol {s:?}"))),
        }
    }
}

/// What text decoders do with a sample they can't parse
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum MalformedPolicy {
    /// Log a warning and keep going
    #[default]
    Drop,
    /// Stop decoding and return an error
    Fail,
}

/// How stale bytes are discarded before a command exchange
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DrainStrategy {
    /// Read and discard lines while the transport reports pending bytes
    UntilEmpty,
    /// Clear the transport input buffer `passes` times, sleeping `delay` after each pass.
    /// Works while the device keeps streaming, since the buffer never has to be empty.
    FixedPasses { passes: u32, delay: Duration },
}

impl Default for DrainStrategy {
    fn default() -> Self {
        DrainStrategy::FixedPasses {
            passes: 3,
            delay: Duration::from_millis(50),
        }
    }
}

pub const DEFAULT_BAUD_RATE: u32 = 115200;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300);
/// The board resets when the port is opened and needs this long to boot
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct AccelConf {
    pub port: String,
    pub baud_rate: u32,
    pub timeout: Duration,
    /// Range applied right after connecting
    pub range: u32,
    /// Pause after opening the port, `None` to skip it
    pub reset_delay: Option<Duration>,
    pub protocol: Protocol,
    /// Overrides the protocol's field delimiter
    pub delimiter: Option<char>,
    pub malformed: MalformedPolicy,
    pub drain: DrainStrategy,
}

impl Default for AccelConf {
    fn default() -> Self {
        AccelConf {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
            range: Range::default().as_g(),
            reset_delay: Some(DEFAULT_RESET_DELAY),
            protocol: Protocol::default(),
            delimiter: None,
            malformed: MalformedPolicy::default(),
            drain: DrainStrategy::default(),
        }
    }
}

impl AccelConf {
    pub fn delimiter(&self) -> char {
        self.delimiter.unwrap_or_else(|| self.protocol.delimiter())
    }
}

mod fake_device;

pub use fake_device::{
    FakeDevice, DEFAULT_RANGE, DEFAULT_TIMER_PERIOD, MAX_TIMER_PERIOD, MIN_TIMER_PERIOD,
};

use accel_adxl345::{error::Result, IoAdapter, RawSample};
use lazy_static::lazy_static;
use manifest_dir_macros::exist_relative_path;
use mockall::mock;
use nom::{
    bytes::complete::take_while_m_n,
    character::complete::multispace0,
    combinator::{all_consuming, map_res},
    multi::many1,
    sequence::delimited,
    IResult,
};

/// Decodes a pair of chars formatted as hex into a byte. For example "FF" -> 255
fn hex_byte(input: &str) -> IResult<&str, u8> {
    map_res(
        take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
        |hex| u8::from_str_radix(hex, 16),
    )(input)
}

pub fn parse_hex_str(input: &str) -> IResult<&str, Vec<u8>> {
    all_consuming(many1(delimited(multispace0, hex_byte, multispace0)))(input)
}

/// Amount of samples in both stream captures
pub const STREAM_SAMPLE_COUNT: usize = 64;

/// Text stream capture, same samples as the binary one
pub const TEXT_STREAM: &str = include_str!(exist_relative_path!(
    "resources/test/text_stream_example.txt"
));

lazy_static! {
    /// Board lying flat at 16g range, streamed with binary firmware
    pub static ref BINARY_STREAM: Vec<u8> = {
        let hex_str = include_str!(exist_relative_path!(
            "resources/test/binary_stream_example.txt"
        ));
        let (_, data) = parse_hex_str(hex_str)
            .expect("Failed to parse resources/test/binary_stream_example.txt");
        data
    };
    /// Samples in the captures, decoded without going through the driver
    pub static ref STREAM_SAMPLES: Vec<RawSample> = BINARY_STREAM
        .chunks_exact(7)
        .map(|rec| {
            let axis = |i: usize| i16::from_le_bytes([rec[i], rec[i + 1]]) as i32;
            RawSample::new(axis(0), axis(2), axis(4))
        })
        .collect();
}

mock! {
    pub IO {}
    impl IoAdapter for IO {
        fn write_all(&mut self, buf: &[u8]) -> Result<()>;
        fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
        fn bytes_to_read(&mut self) -> Result<usize>;
        fn clear_input(&mut self) -> Result<()>;
    }
}

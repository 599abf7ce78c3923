use bytes::{Buf, BytesMut};

use super::{
    parser::{binary_record, text_sample, RECORD_SIZE, SAMPLE_SEPARATOR},
    RawSample,
};
use crate::{
    config::{MalformedPolicy, Protocol},
    error::{Error, Result},
};

/// Turns bytes recieved while streaming into samples
pub trait SampleDecoder {
    /// Consumes every complete line or record in `buf`, partial data stays in place until more
    /// bytes arrive. An empty buffer decodes into no samples.
    fn decode(&mut self, buf: &mut BytesMut) -> Result<Vec<RawSample>>;
}

/// Picks a decoder matching the wire format of a firmware revision
pub fn decoder_for(
    protocol: Protocol,
    delimiter: char,
    malformed: MalformedPolicy,
) -> Box<dyn SampleDecoder + Send> {
    match protocol {
        Protocol::SpaceText | Protocol::CommaText => {
            Box::new(TextDecoder::new(delimiter, malformed))
        }
        Protocol::Binary => Box::new(BinaryDecoder),
    }
}

/// Newline terminated lines of `;` separated samples
pub struct TextDecoder {
    delimiter: char,
    malformed: MalformedPolicy,
}

impl TextDecoder {
    pub fn new(delimiter: char, malformed: MalformedPolicy) -> Self {
        TextDecoder {
            delimiter,
            malformed,
        }
    }

    fn decode_line(&self, line: &str, samples: &mut Vec<RawSample>) -> Result<()> {
        for group in line.trim().split(SAMPLE_SEPARATOR) {
            if group.trim().is_empty() {
                continue;
            }
            match text_sample(group, self.delimiter) {
                Ok(sample) => samples.push(sample),
                Err(err) => match self.malformed {
                    MalformedPolicy::Drop => log::warn!("Dropped sample {group:?}: {err}"),
                    MalformedPolicy::Fail => return Err(err),
                },
            }
        }
        Ok(())
    }
}

impl SampleDecoder for TextDecoder {
    fn decode(&mut self, buf: &mut BytesMut) -> Result<Vec<RawSample>> {
        let mut samples = Vec::new();
        while let Some(end) = buf.iter().position(|b| *b == b'\n') {
            let line = buf.split_to(end + 1);
            self.decode_line(&String::from_utf8_lossy(&line), &mut samples)?;
        }
        Ok(samples)
    }
}

/// Fixed size little-endian records with a trailing checksum byte that has to be zero
pub struct BinaryDecoder;

impl SampleDecoder for BinaryDecoder {
    fn decode(&mut self, buf: &mut BytesMut) -> Result<Vec<RawSample>> {
        let mut samples = Vec::with_capacity(buf.len() / RECORD_SIZE);
        while buf.len() >= RECORD_SIZE {
            let (sample, checksum) = match binary_record(&buf[..RECORD_SIZE]) {
                Ok((_, record)) => record,
                // Can't happen with a full record in the slice
                Err(_) => return Err(Error::InvalidData("Truncated binary record".to_string())),
            };
            if checksum != 0 {
                // There is no way to tell where the next record starts
                log::trace!("Bad record {:02X?}", &buf[..RECORD_SIZE]);
                return Err(Error::OutOfSync(checksum));
            }
            buf.advance(RECORD_SIZE);
            samples.push(sample);
        }
        Ok(samples)
    }
}

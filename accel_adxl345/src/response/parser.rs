use core::str::FromStr;

use nom::{
    character::complete::space0,
    combinator::{all_consuming, map},
    number::{
        complete::double,
        streaming::{be_u8, le_i16},
    },
    sequence::{delimited, tuple},
    IResult,
};

use super::{RawSample, Reply};
use crate::error::{Error, Result};

/// Size of a single binary sample record
pub const RECORD_SIZE: usize = 7;

/// Separates samples when several of them are sent on the same line
pub const SAMPLE_SEPARATOR: char = ';';

/// Parses a binary record into a sample and its checksum byte. Returns `Incomplete` until all
/// 7 bytes are available.
pub fn binary_record(input: &[u8]) -> IResult<&[u8], (RawSample, u8)> {
    map(
        tuple((le_i16, le_i16, le_i16, be_u8)),
        |(x, y, z, checksum)| (RawSample::new(x.into(), y.into(), z.into()), checksum),
    )(input)
}

/// Splits a line into fields. Whitespace delimiters treat runs of whitespace as one separator.
pub fn split_fields(line: &str, delimiter: char) -> Vec<&str> {
    if delimiter.is_whitespace() {
        line.split_whitespace().collect()
    } else {
        line.split(delimiter).map(str::trim).collect()
    }
}

fn number(input: &str) -> IResult<&str, f64> {
    delimited(space0, double, space0)(input)
}

/// Converts a whole number, possibly sent as a float like `251.0`, into a raw count
pub fn count_from_f64(value: f64) -> Result<i32> {
    if value.is_finite()
        && value.fract() == 0.0
        && value >= i32::MIN as f64
        && value <= i32::MAX as f64
    {
        Ok(value as i32)
    } else {
        Err(Error::InvalidData(format!("{value} is not a whole count")))
    }
}

/// Parses a count written either as an integer or as a float
pub fn parse_count(field: &str) -> Result<i32> {
    let (_, value) = all_consuming(number)(field)
        .map_err(|_| Error::InvalidData(format!("{field:?} is not a number")))?;
    count_from_f64(value)
}

/// Parses one `x<d>y<d>z` group of a text sample line
pub fn text_sample(group: &str, delimiter: char) -> Result<RawSample> {
    match split_fields(group, delimiter)[..] {
        [x, y, z] => Ok(RawSample::new(
            parse_count(x)?,
            parse_count(y)?,
            parse_count(z)?,
        )),
        ref fields => Err(Error::InvalidData(format!(
            "Expected 3 fields in sample, got {}",
            fields.len()
        ))),
    }
}

/// Parses a reply line to a query: a single value or a delimited list of values
pub fn parse_reply<T: FromStr>(line: &str, delimiter: char) -> Result<Reply<T>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Reply::Empty);
    }
    let mut values = split_fields(line, delimiter)
        .into_iter()
        .map(|field| {
            field
                .parse()
                .map_err(|_| Error::InvalidData(format!("Could not parse {field:?} in reply")))
        })
        .collect::<Result<Vec<T>>>()?;
    if values.len() == 1 {
        Ok(Reply::Scalar(values.remove(0)))
    } else {
        Ok(Reply::List(values))
    }
}

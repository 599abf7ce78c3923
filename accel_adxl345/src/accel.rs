use crate::{
    command::Command,
    config::{AccelConf, DrainStrategy, Protocol, Range, ACCEL_SCALE},
    error::{Error, Result},
    io_adapter::IoAdapter,
    response::{
        decoder::{decoder_for, SampleDecoder},
        parser::{count_from_f64, parse_reply},
        RawSample, Reply, Sample, SampleBatch,
    },
};
use bytes::BytesMut;
use core::{fmt, str::FromStr};
use scopeguard::{guard, ScopeGuard};
use std::thread::sleep;

const READ_CHUNK_SIZE: usize = 256;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum StreamState {
    Idle,
    Streaming,
}

/// Session with an ADXL345 sensor board. Owns the transport for as long as it's connected.
///
/// Settings are cached write-through: every setter sends the new value and then queries the
/// device for the value it actually applied, so each call costs an extra round trip.
pub struct Accelerometer<IO>
where
    IO: IoAdapter,
{
    io: IO,
    // Bytes read from transport but not consumed yet
    buf: BytesMut,
    decoder: Box<dyn SampleDecoder + Send>,
    protocol: Protocol,
    delimiter: char,
    drain: DrainStrategy,
    state: StreamState,
    scale: f64,
    // Cached device settings, intervals are in microseconds
    sample_dt: u32,
    range: Range,
    min_sample_dt: u32,
    max_sample_dt: u32,
}

impl<IO> fmt::Debug for Accelerometer<IO>
where
    IO: IoAdapter,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accelerometer")
            .field("protocol", &self.protocol)
            .field("state", &self.state)
            .field("range", &self.range)
            .field("sample_dt", &self.sample_dt)
            .field("buffered", &self.buf.len())
            .finish_non_exhaustive()
    }
}

impl<IO> Accelerometer<IO>
where
    IO: IoAdapter,
{
    /// Validates configuration, waits for the board to boot and reads its current settings
    pub fn connect(io: IO, conf: &AccelConf) -> Result<Self> {
        let range = Range::try_from(conf.range)?;
        if let Some(delay) = conf.reset_delay {
            log::debug!("Waiting {delay:?} for the board to reset");
            sleep(delay);
        }

        let mut accel = Accelerometer {
            io,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            decoder: decoder_for(conf.protocol, conf.delimiter(), conf.malformed),
            protocol: conf.protocol,
            delimiter: conf.delimiter(),
            drain: conf.drain,
            state: StreamState::Idle,
            scale: ACCEL_SCALE,
            sample_dt: 0,
            range,
            min_sample_dt: 0,
            max_sample_dt: 0,
        };
        // Board could be left streaming by a previous session
        accel.stop()?;

        accel.sample_dt = accel.query_sample_dt()?;
        accel.range = accel.query_range()?;
        accel.min_sample_dt = accel.query_min_sample_dt()?;
        accel.max_sample_dt = accel.query_max_sample_dt()?;
        log::debug!(
            "Connected: dt = {}us, range = {}g, dt bounds = [{}us, {}us]",
            accel.sample_dt,
            accel.range,
            accel.min_sample_dt,
            accel.max_sample_dt
        );

        if accel.range != range {
            accel.set_range(range.as_g())?;
        }
        Ok(accel)
    }

    /// Stops streaming if needed and hands the transport back
    pub fn disconnect(mut self) -> Result<IO> {
        if self.state == StreamState::Streaming {
            self.stop()?;
        }
        Ok(self.io)
    }

    pub fn get_ref(&self) -> &IO {
        &self.io
    }

    pub fn get_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn send_command(&mut self, cmd: Command) -> Result<()> {
        if !self.protocol.supports(&cmd) {
            return Err(Error::Unsupported(cmd, self.protocol));
        }
        let frame = cmd.encode();
        log::trace!("Sending {:?}", frame.trim_end());
        self.io.write_all(frame.as_bytes())
    }

    fn fill_buffer(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let count = self.io.read(&mut chunk)?;
        self.buf.extend_from_slice(&chunk[..count]);
        Ok(count)
    }

    fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(end) = self.buf.iter().position(|b| *b == b'\n') {
                let line = self.buf.split_to(end + 1);
                return Ok(String::from_utf8_lossy(&line).trim().to_string());
            }
            if self.fill_buffer()? == 0 {
                // Timed out, hand back whatever part of the line did arrive
                let line = self.buf.split();
                return Ok(String::from_utf8_lossy(&line).trim().to_string());
            }
        }
    }

    fn read_reply<T: FromStr>(&mut self) -> Result<Reply<T>> {
        let line = self.read_line()?;
        log::trace!("Recieved {line:?}");
        parse_reply(&line, self.delimiter)
    }

    fn query<T: FromStr>(&mut self, cmd: Command) -> Result<T> {
        debug_assert!(cmd.expects_reply(), "{cmd:?} is not answered by the board");
        self.send_command(cmd)?;
        match self.read_reply()? {
            Reply::Scalar(value) => Ok(value),
            Reply::Empty => Err(Error::NoResponse),
            Reply::List(_) => Err(Error::UnexpectedResponse),
        }
    }

    /// Discards every stale byte, both in transport and in session read buffer
    pub fn drain(&mut self) -> Result<()> {
        match self.drain {
            DrainStrategy::UntilEmpty => {
                while self.io.bytes_to_read()? > 0 {
                    let line = self.read_line()?;
                    log::trace!("Drained {line:?}");
                }
            }
            DrainStrategy::FixedPasses { passes, delay } => {
                for _ in 0..passes {
                    self.io.clear_input()?;
                    sleep(delay);
                }
            }
        }
        if !self.buf.is_empty() {
            log::trace!("Dropped {} buffered bytes", self.buf.len());
            self.buf.clear();
        }
        Ok(())
    }

    pub fn start_streaming(&mut self) -> Result<()> {
        self.send_command(Command::StartStreaming)?;
        self.state = StreamState::Streaming;
        Ok(())
    }

    pub fn stop_streaming(&mut self) -> Result<()> {
        self.send_command(Command::StopStreaming)?;
        self.state = StreamState::Idle;
        Ok(())
    }

    /// Drains stale bytes and starts streaming
    pub fn start(&mut self) -> Result<()> {
        self.drain()?;
        self.start_streaming()?;
        log::debug!("Streaming started");
        Ok(())
    }

    /// Stops streaming and drains samples that were already in flight
    pub fn stop(&mut self) -> Result<()> {
        self.stop_streaming()?;
        self.drain()?;
        log::debug!("Streaming stopped");
        Ok(())
    }

    /// Reads what transport has available and decodes every complete sample in it
    pub fn read_samples(&mut self) -> Result<Vec<RawSample>> {
        self.fill_buffer()?;
        self.decoder.decode(&mut self.buf)
    }

    pub(crate) fn batch_from_raw(&self, mut raw: Vec<RawSample>, n: usize) -> SampleBatch {
        raw.truncate(n);
        SampleBatch::from_raw(&raw, self.scale, self.sample_dt_secs())
    }

    /// Streams exactly `n` samples at the current sample rate. Blocks until all of them arrive.
    pub fn collect(&mut self, n: usize) -> Result<SampleBatch> {
        if self.state == StreamState::Idle {
            self.start()?;
        }

        let mut raw = Vec::new();
        let mut s = guard(&mut *self, |s| {
            if let Err(err) = s.stop_streaming() {
                log::error!("Failed to stop streaming: {err}");
            }
        });
        while raw.len() < n {
            raw.extend(s.read_samples()?);
            log::trace!("Collected {}/{} samples", raw.len().min(n), n);
        }
        ScopeGuard::into_inner(s);

        self.stop()?;
        Ok(self.batch_from_raw(raw, n))
    }

    /// Takes a single sample without streaming
    pub fn peek_raw(&mut self) -> Result<RawSample> {
        debug_assert!(Command::GetSample.expects_reply());
        self.send_command(Command::GetSample)?;
        match self.read_reply::<f64>()? {
            Reply::List(v) if v.len() == 3 => Ok(RawSample::new(
                count_from_f64(v[0])?,
                count_from_f64(v[1])?,
                count_from_f64(v[2])?,
            )),
            Reply::Empty => Err(Error::NoResponse),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    pub fn peek(&mut self) -> Result<Sample> {
        Ok(self.peek_raw()?.scale(self.scale))
    }

    pub fn allowed_ranges(&self) -> &'static [Range] {
        &Range::ALL
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn query_range(&mut self) -> Result<Range> {
        let g: u32 = self.query(Command::GetRange)?;
        Range::try_from(g)
    }

    /// Sets measurement range in g, anything but 2, 4, 8 or 16 is rejected without talking to
    /// the device
    pub fn set_range(&mut self, value: u32) -> Result<()> {
        let range = Range::try_from(value)?;
        self.send_command(Command::SetRange(range))?;
        self.range = self.query_range()?;
        log::debug!("Range set to {}g", self.range);
        Ok(())
    }

    /// Sample interval in microseconds
    pub fn sample_dt(&self) -> u32 {
        self.sample_dt
    }

    fn sample_dt_secs(&self) -> f64 {
        self.sample_dt as f64 * 1.0e-6
    }

    /// Some firmware revisions report the interval as a float, it is truncated to whole
    /// microseconds
    pub fn query_sample_dt(&mut self) -> Result<u32> {
        let dt: f64 = self.query(Command::GetSampleDt)?;
        if !dt.is_finite() || dt < 0.0 || dt > u32::MAX as f64 {
            return Err(Error::InvalidData(format!("{dt} is not a sample interval")));
        }
        Ok(dt as u32)
    }

    /// Sets sample interval in microseconds, has to be within bounds reported by the device
    pub fn set_sample_dt(&mut self, dt: u32) -> Result<()> {
        if dt < self.min_sample_dt || dt > self.max_sample_dt {
            return Err(Error::SampleDtOutOfRange {
                value: dt,
                min: self.min_sample_dt,
                max: self.max_sample_dt,
            });
        }
        self.send_command(Command::SetSampleDt(dt))?;
        self.sample_dt = self.query_sample_dt()?;
        log::debug!("Sample interval set to {}us", self.sample_dt);
        Ok(())
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> f64 {
        1.0e6 / self.sample_dt as f64
    }

    /// Sets sample rate in Hz, rounded down to a whole microsecond interval
    pub fn set_sample_rate(&mut self, freq: f64) -> Result<()> {
        if !freq.is_finite() || freq <= 0.0 {
            return Err(Error::InvalidSampleRate(freq));
        }
        self.set_sample_dt((1.0e6 / freq) as u32)
    }

    pub fn min_sample_dt(&self) -> u32 {
        self.min_sample_dt
    }

    pub fn max_sample_dt(&self) -> u32 {
        self.max_sample_dt
    }

    pub fn query_min_sample_dt(&mut self) -> Result<u32> {
        self.query(Command::GetMinSampleDt)
    }

    pub fn query_max_sample_dt(&mut self) -> Result<u32> {
        self.query(Command::GetMaxSampleDt)
    }

    pub fn max_sample_rate(&self) -> f64 {
        1.0e6 / self.min_sample_dt as f64
    }

    pub fn min_sample_rate(&self) -> f64 {
        1.0e6 / self.max_sample_dt as f64
    }

    /// Amount of records the firmware discarded, only binary firmware keeps track of it
    pub fn bad_sample_count(&mut self) -> Result<u32> {
        self.query(Command::GetBadSampleCount)
    }
}

use accel_adxl345::{error::Result, IoAdapter, Protocol, RawSample};
use std::collections::VecDeque;

pub const DEFAULT_TIMER_PERIOD: u32 = 2000;
pub const MIN_TIMER_PERIOD: u32 = 2000;
pub const MAX_TIMER_PERIOD: u32 = 100000;
pub const DEFAULT_RANGE: u32 = 16;
const ALLOWED_RANGE: [u32; 4] = [2, 4, 8, 16];
const SAMPLES_PER_LINE: usize = 4;

/// Simulated sensor board firmware. Every read while streaming makes another burst of samples
/// arrive, like a UART filling up between two reads.
pub struct FakeDevice {
    protocol: Protocol,
    timer_period: u32,
    range: u32,
    streaming: bool,
    bad_sample_count: u32,
    // Bytes waiting to be read by host
    output: VecDeque<u8>,
    // Partially written command line
    input: Vec<u8>,
    commands: Vec<String>,
    samples: Vec<RawSample>,
    next_sample: usize,
    burst: usize,
    streamed: usize,
    corrupt_after: Option<usize>,
    float_values: bool,
}

impl FakeDevice {
    /// Streams `samples` in a loop
    pub fn new(protocol: Protocol, samples: &[RawSample]) -> Self {
        FakeDevice {
            protocol,
            timer_period: DEFAULT_TIMER_PERIOD,
            range: DEFAULT_RANGE,
            streaming: false,
            bad_sample_count: 0,
            output: VecDeque::new(),
            input: Vec::new(),
            commands: Vec::new(),
            samples: samples.to_vec(),
            next_sample: 0,
            burst: 5,
            streamed: 0,
            corrupt_after: None,
            float_values: false,
        }
    }

    /// Amount of samples arriving between two reads
    pub fn with_burst(mut self, burst: usize) -> Self {
        self.burst = burst;
        self
    }

    /// Sends a record with a bad checksum after streaming `count` good samples
    pub fn corrupt_after(mut self, count: usize) -> Self {
        self.corrupt_after = Some(count);
        self
    }

    /// Writes sample interval and text samples as floats, `2000.0` instead of `2000`
    pub fn with_float_values(mut self) -> Self {
        self.float_values = true;
        self
    }

    pub fn with_range(mut self, range: u32) -> Self {
        self.range = range;
        self
    }

    pub fn with_bad_sample_count(mut self, count: u32) -> Self {
        self.bad_sample_count = count;
        self
    }

    /// Queues bytes as if they were sent by the board
    pub fn push_output(&mut self, data: &[u8]) {
        self.output.extend(data);
    }

    /// Command lines recieved so far, without the trailing newline
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn range(&self) -> u32 {
        self.range
    }

    pub fn timer_period(&self) -> u32 {
        self.timer_period
    }

    fn delimiter(&self) -> char {
        self.protocol.delimiter()
    }

    fn reply(&mut self, value: impl ToString) {
        let line = format!("{}\r\n", value.to_string());
        self.output.extend(line.as_bytes());
    }

    fn next_sample(&mut self) -> RawSample {
        let sample = self.samples[self.next_sample % self.samples.len()];
        self.next_sample += 1;
        sample
    }

    fn format_value(&self, value: i64) -> String {
        if self.float_values {
            format!("{value}.0")
        } else {
            value.to_string()
        }
    }

    fn format_sample(&self, s: &RawSample) -> String {
        let d = self.delimiter();
        let [x, y, z] = [s.x, s.y, s.z].map(|v| self.format_value(v.into()));
        format!("{x}{d}{y}{d}{z}")
    }

    fn emit_burst(&mut self) {
        if self.samples.is_empty() {
            return;
        }
        let burst: Vec<RawSample> = (0..self.burst).map(|_| self.next_sample()).collect();
        match self.protocol {
            Protocol::Binary => {
                for s in burst {
                    let checksum = match self.corrupt_after {
                        Some(count) if self.streamed == count => 0x01,
                        _ => 0x00,
                    };
                    for axis in [s.x, s.y, s.z] {
                        self.output.extend((axis as i16).to_le_bytes());
                    }
                    self.output.push_back(checksum);
                    self.streamed += 1;
                }
            }
            Protocol::SpaceText | Protocol::CommaText => {
                for line in burst.chunks(SAMPLES_PER_LINE) {
                    let line = line
                        .iter()
                        .map(|s| self.format_sample(s))
                        .collect::<Vec<_>>()
                        .join(";");
                    self.output.extend(format!("{line}\r\n").as_bytes());
                }
                self.streamed += burst.len();
            }
        }
    }

    fn handle_command(&mut self, line: &str) {
        self.commands.push(line.to_string());
        let fields: Vec<u32> = line
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .filter_map(|f| f.trim().parse().ok())
            .collect();
        match fields[..] {
            [0] => {
                // Samples already in the UART still go out after a stop
                if self.streaming {
                    self.emit_burst();
                }
                self.streaming = false;
            }
            [1] => self.streaming = true,
            [2, period] => {
                if (MIN_TIMER_PERIOD..=MAX_TIMER_PERIOD).contains(&period) {
                    self.timer_period = period;
                }
            }
            [3] => {
                let period = self.format_value(self.timer_period.into());
                self.reply(period)
            }
            [4, range] => {
                if ALLOWED_RANGE.contains(&range) {
                    self.range = range;
                }
            }
            [5] => self.reply(self.range),
            [6] => {
                let sample = self.next_sample();
                let formatted = self.format_sample(&sample);
                self.reply(formatted);
            }
            [7] => self.reply(MAX_TIMER_PERIOD),
            [8] => self.reply(MIN_TIMER_PERIOD),
            [9] if self.protocol == Protocol::Binary => self.reply(self.bad_sample_count),
            _ => {}
        }
    }
}

impl IoAdapter for FakeDevice {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.input.extend_from_slice(buf);
        while let Some(end) = self.input.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.input.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line).trim_end().to_string();
            self.handle_command(&line);
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.streaming {
            self.emit_burst();
        }
        let count = buf.len().min(self.output.len());
        for (dst, src) in buf.iter_mut().zip(self.output.drain(..count)) {
            *dst = src;
        }
        Ok(count)
    }

    fn bytes_to_read(&mut self) -> Result<usize> {
        if self.streaming {
            self.emit_burst();
        }
        Ok(self.output.len())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.output.clear();
        Ok(())
    }
}

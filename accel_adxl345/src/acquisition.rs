//! Collecting samples without blocking, for callers that poll on a timer and have to return
//! quickly between ticks.

use crate::{
    accel::Accelerometer,
    error::{Error, Result},
    io_adapter::IoAdapter,
    response::{RawSample, SampleBatch},
};
use core::mem;

/// Polling only reads once more than this many bytes are waiting, so a read never has to wait
/// for the rest of a line
pub const MIN_PENDING_BYTES: usize = 15;

/// Upper bound for memory reserved up front, the rest grows as samples arrive
const MAX_PREALLOCATED: usize = 4096;

/// Amount of samples needed to cover `duration` seconds at `rate` Hz
pub fn duration_to_count(duration: f64, rate: f64) -> Result<usize> {
    let count = (duration * rate).floor();
    if !count.is_finite() || count < 0.0 || count > usize::MAX as f64 {
        return Err(Error::InvalidDuration(duration));
    }
    Ok(count as usize)
}

/// Samples gathered so far by an ongoing acquisition
#[derive(Debug)]
pub struct Acquisition {
    target: usize,
    raw: Vec<RawSample>,
    // Batch was already handed out
    finished: bool,
}

impl Acquisition {
    fn new(target: usize) -> Self {
        Acquisition {
            target,
            raw: Vec::with_capacity(target.min(MAX_PREALLOCATED)),
            finished: false,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn collected(&self) -> usize {
        if self.finished {
            self.target
        } else {
            self.raw.len().min(self.target)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.finished || self.raw.len() >= self.target
    }

    /// Set once [`Accelerometer::poll`] returned the batch
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn percent(&self) -> f64 {
        if self.target == 0 {
            100.0
        } else {
            100.0 * self.collected() as f64 / self.target as f64
        }
    }
}

#[derive(PartialEq, Debug)]
pub enum AcquisitionStatus {
    Acquiring { collected: usize, target: usize },
    Done(SampleBatch),
}

impl<IO> Accelerometer<IO>
where
    IO: IoAdapter,
{
    /// Starts streaming, samples are then gathered with [`Accelerometer::poll`]
    pub fn begin_acquisition(&mut self, n: usize) -> Result<Acquisition> {
        self.start()?;
        Ok(Acquisition::new(n))
    }

    fn read_pending(&mut self, acq: &mut Acquisition) -> Result<()> {
        while !acq.is_complete() && self.get_mut().bytes_to_read()? > MIN_PENDING_BYTES {
            let samples = self.read_samples()?;
            acq.raw.extend(samples);
        }
        Ok(())
    }

    /// Reads only what already arrived. Once enough samples are gathered streaming is stopped
    /// and the scaled batch is returned. Polling a finished acquisition again is an error.
    pub fn poll(&mut self, acq: &mut Acquisition) -> Result<AcquisitionStatus> {
        if acq.finished {
            return Err(Error::AcquisitionFinished);
        }
        if let Err(err) = self.read_pending(acq) {
            if let Err(stop_err) = self.stop() {
                log::error!("Failed to stop streaming: {stop_err}");
            }
            return Err(err);
        }

        if acq.is_complete() {
            self.stop()?;
            let raw = mem::take(&mut acq.raw);
            acq.finished = true;
            return Ok(AcquisitionStatus::Done(self.batch_from_raw(raw, acq.target)));
        }
        Ok(AcquisitionStatus::Acquiring {
            collected: acq.collected(),
            target: acq.target,
        })
    }
}

pub mod decoder;
pub mod parser;

/// Single (x, y, z) reading in raw counts
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct RawSample {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl RawSample {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        RawSample { x, y, z }
    }

    pub fn scale(&self, factor: f64) -> Sample {
        Sample {
            x: self.x as f64 * factor,
            y: self.y as f64 * factor,
            z: self.z as f64 * factor,
        }
    }
}

/// Single (x, y, z) reading in physical units
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Samples together with the time each one was taken at, in seconds from the first sample
#[derive(PartialEq, Debug, Clone, Default)]
pub struct SampleBatch {
    pub t: Vec<f64>,
    pub samples: Vec<Sample>,
}

impl SampleBatch {
    /// Scales raw samples and lays them out `dt_s` seconds apart
    pub fn from_raw(raw: &[RawSample], scale: f64, dt_s: f64) -> Self {
        SampleBatch {
            t: (0..raw.len()).map(|i| i as f64 * dt_s).collect(),
            samples: raw.iter().map(|s| s.scale(scale)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterates over (t, sample) rows
    pub fn rows(&self) -> impl Iterator<Item = (f64, &Sample)> + '_ {
        self.t.iter().copied().zip(self.samples.iter())
    }
}

/// Decoded line of text sent in response to a query
#[derive(PartialEq, Debug, Clone)]
pub enum Reply<T> {
    /// Nothing arrived before the read timed out
    Empty,
    Scalar(T),
    List(Vec<T>),
}

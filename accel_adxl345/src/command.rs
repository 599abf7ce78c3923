use crate::config::Range;

/// Command that can be sent to the sensor board
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Command {
    StopStreaming,
    StartStreaming,
    /// Timer period in microseconds
    SetSampleDt(u32),
    GetSampleDt,
    SetRange(Range),
    GetRange,
    GetSample,
    GetMaxSampleDt,
    GetMinSampleDt,
    GetBadSampleCount,
}

impl Command {
    /// Command id as understood by firmware
    pub fn code(&self) -> u8 {
        use Command::*;
        match *self {
            StopStreaming => 0,
            StartStreaming => 1,
            SetSampleDt(_) => 2,
            GetSampleDt => 3,
            SetRange(_) => 4,
            GetRange => 5,
            GetSample => 6,
            GetMaxSampleDt => 7,
            GetMinSampleDt => 8,
            GetBadSampleCount => 9,
        }
    }

    fn argument(&self) -> Option<u32> {
        match *self {
            Command::SetSampleDt(dt) => Some(dt),
            Command::SetRange(r) => Some(r.as_g()),
            _ => None,
        }
    }

    /// Frames the command as a single text line, `[id]\n` or `[id,arg]\n`
    pub fn encode(&self) -> String {
        match self.argument() {
            Some(arg) => format!("[{},{}]\n", self.code(), arg),
            None => format!("[{}]\n", self.code()),
        }
    }

    /// Commands that are answered with a line of text
    pub fn expects_reply(&self) -> bool {
        use Command::*;
        !matches!(
            *self,
            StopStreaming | StartStreaming | SetSampleDt(_) | SetRange(_)
        )
    }
}

use crate::{output::Output, serial::SerialConf};
use clap::{Args, Parser, Subcommand};
use simple_eyre::{eyre::eyre, Result};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lists connected serial devices
    List,
    /// Print current settings of the board
    Info(SerialConf),
    /// Take a single sample without streaming
    Peek(SerialConf),
    /// Sample rate related commands, in Hz
    Rate(RateCommand),
    /// Sample interval related commands, in microseconds
    Dt(DtCommand),
    /// Amount of records binary firmware had to discard
    BadSamples(SerialConf),
    /// Record samples and save them to a file
    Read(ReadConf),
}

#[derive(Args)]
pub struct RateCommand {
    #[clap(subcommand)]
    pub command: RateCommands,
}

#[derive(Subcommand)]
pub enum RateCommands {
    /// Get current sample rate
    Get(SerialConf),
    /// Set sample rate
    Set(SetRateConf),
}

#[derive(Args)]
pub struct SetRateConf {
    /// New sample rate in Hz
    #[clap(value_parser)]
    pub rate: f64,
    #[clap(flatten)]
    pub serial: SerialConf,
}

#[derive(Args)]
pub struct DtCommand {
    #[clap(subcommand)]
    pub command: DtCommands,
}

#[derive(Subcommand)]
pub enum DtCommands {
    /// Get current sample interval
    Get(SerialConf),
    /// Set sample interval
    Set(SetDtConf),
}

#[derive(Args)]
pub struct SetDtConf {
    /// New sample interval in microseconds
    #[clap(value_parser)]
    pub dt: u32,
    #[clap(flatten)]
    pub serial: SerialConf,
}

#[derive(Args)]
pub struct ReadConf {
    /// Amount of samples to record
    #[clap(short = 'n', long, value_parser, required_unless_present = "duration")]
    pub count: Option<usize>,

    /// How long to record, in seconds
    #[clap(short, long, value_parser = duration_parser, conflicts_with = "count")]
    pub duration: Option<f64>,

    /// Sample rate in Hz used for recording, current rate is kept if omitted
    #[clap(short, long, value_parser)]
    pub rate: Option<f64>,

    #[clap(flatten)]
    pub output: Output,

    #[clap(flatten)]
    pub serial: SerialConf,
}

fn duration_parser(s: &str) -> Result<f64> {
    let duration: f64 = s.parse()?;
    if duration.is_finite() && duration >= 0.0 {
        Ok(duration)
    } else {
        Err(eyre!("Duration should be a finite, non-negative number of seconds"))
    }
}

mod cli;
mod output;
mod serial;

use accel_adxl345::{duration_to_count, AcquisitionStatus};
use clap::Parser;
use simple_eyre::{eyre::eyre, Result};
use std::{io::Write, thread::sleep, time::Duration};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use cli::*;
use serial::SerialConf;

/// Pause between two polls while recording
const POLL_INTERVAL: Duration = Duration::from_millis(20);

fn main() -> Result<()> {
    simple_eyre::install()?;
    let cli = Cli::parse();
    env_logger::init();

    match &cli.command {
        Commands::List => list_serial(),
        Commands::Info(conf) => print_info(conf),
        Commands::Peek(conf) => peek(conf),
        Commands::Rate(subcomm) => match &subcomm.command {
            RateCommands::Get(conf) => get_rate(conf),
            RateCommands::Set(conf) => set_rate(conf),
        },
        Commands::Dt(subcomm) => match &subcomm.command {
            DtCommands::Get(conf) => get_dt(conf),
            DtCommands::Set(conf) => set_dt(conf),
        },
        Commands::BadSamples(conf) => get_bad_samples(conf),
        Commands::Read(conf) => read_samples(conf),
    }
}

/// Returns std::io::Write stream with coloring enabled if program is run interactively
fn get_stdout() -> StandardStream {
    StandardStream::stdout(if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    })
}

fn list_serial() -> Result<()> {
    let mut stdout = get_stdout();
    let paths = serialport::available_ports()?;
    if paths.is_empty() {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        writeln!(&mut stdout, "No connected serial ports found.")?;
    } else {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        writeln!(&mut stdout, "Connected serial ports:")?;
    }
    stdout.reset()?;
    paths.iter().for_each(|p| println!("{}", p.port_name));

    Ok(())
}

fn print_info(conf: &SerialConf) -> Result<()> {
    let accel = conf.open_accelerometer()?;
    println!("Protocol: {}", accel.protocol());
    let allowed: Vec<_> = accel.allowed_ranges().iter().map(|r| r.to_string()).collect();
    println!("Range: {}g (allowed: {})", accel.range(), allowed.join(", "));
    println!(
        "Sample interval: {}us ({:.2} Hz)",
        accel.sample_dt(),
        accel.sample_rate()
    );
    println!(
        "Allowed interval: {}us..{}us ({:.2} Hz..{:.2} Hz)",
        accel.min_sample_dt(),
        accel.max_sample_dt(),
        accel.min_sample_rate(),
        accel.max_sample_rate()
    );
    accel.disconnect()?;
    Ok(())
}

fn peek(conf: &SerialConf) -> Result<()> {
    let mut accel = conf.open_accelerometer()?;
    let sample = accel.peek()?;
    println!("{:.6} {:.6} {:.6}", sample.x, sample.y, sample.z);
    accel.disconnect()?;
    Ok(())
}

fn get_rate(conf: &SerialConf) -> Result<()> {
    let accel = conf.open_accelerometer()?;
    println!("Current sample rate: {:.2} Hz", accel.sample_rate());
    Ok(())
}

fn set_rate(conf: &SetRateConf) -> Result<()> {
    let mut accel = conf.serial.open_accelerometer()?;
    accel.set_sample_rate(conf.rate)?;
    println!("Sample rate set to {:.2} Hz", accel.sample_rate());
    Ok(())
}

fn get_dt(conf: &SerialConf) -> Result<()> {
    let accel = conf.open_accelerometer()?;
    println!("Current sample interval: {}us", accel.sample_dt());
    Ok(())
}

fn set_dt(conf: &SetDtConf) -> Result<()> {
    let mut accel = conf.serial.open_accelerometer()?;
    accel.set_sample_dt(conf.dt)?;
    println!("Sample interval set to {}us", accel.sample_dt());
    Ok(())
}

fn get_bad_samples(conf: &SerialConf) -> Result<()> {
    let mut accel = conf.open_accelerometer()?;
    println!("Discarded records: {}", accel.bad_sample_count()?);
    Ok(())
}

fn read_samples(conf: &ReadConf) -> Result<()> {
    let mut accel = conf.serial.open_accelerometer()?;
    if let Some(rate) = conf.rate {
        accel.set_sample_rate(rate)?;
    }
    let count = match (conf.count, conf.duration) {
        (Some(count), _) => count,
        (None, Some(duration)) => duration_to_count(duration, accel.sample_rate())?,
        (None, None) => return Err(eyre!("Either sample count or duration is required")),
    };
    log::info!(
        "Recording {count} samples at {:.2} Hz",
        accel.sample_rate()
    );

    let mut acq = accel.begin_acquisition(count)?;
    let batch = loop {
        match accel.poll(&mut acq)? {
            AcquisitionStatus::Done(batch) => break batch,
            AcquisitionStatus::Acquiring { collected, target } => {
                log::debug!("Collected {collected}/{target} samples ({:.0}%)", acq.percent());
                sleep(POLL_INTERVAL);
            }
        }
    };
    accel.disconnect()?;

    conf.output.write_batch(&batch)?;
    let mut stdout = get_stdout();
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    writeln!(&mut stdout, "Saved {} samples to {:?}", batch.len(), conf.output.output)?;
    stdout.reset()?;
    Ok(())
}

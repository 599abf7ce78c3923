use accel_adxl345::SampleBatch;
use clap::{Args, ValueEnum};
use plotters::prelude::*;
use simple_eyre::{eyre::eyre, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

#[derive(Args)]
pub struct Output {
    /// Path to a file where samples should be stored
    #[clap(short, long, value_parser = unique_path_parser, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// File format for sample output
    #[clap(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

fn unique_path_parser(p: &str) -> Result<PathBuf> {
    let p = Path::new(p);
    if p.try_exists()? {
        Err(eyre!("Path {p:?} already exists"))
    } else {
        Ok(p.to_path_buf())
    }
}

#[derive(ValueEnum, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Whitespace separated `t ax ay az` rows
    #[default]
    Table,
    Csv,
    /// PNG image with every axis plotted against time
    Chart,
}

/// Formats like C's `%.18e`, exponent always has a sign and at least two digits
fn format_exp(v: f64) -> String {
    let s = format!("{v:.18e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => match exp.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.abs())
            }
            Err(_) => s,
        },
        // NaN and infinities
        None => s,
    }
}

fn batch_to_table(batch: &SampleBatch) -> String {
    log::trace!("Formatting {} samples as table", batch.len());
    batch
        .rows()
        .map(|(t, s)| {
            std::iter::once(t)
                .chain(s.as_array())
                .map(format_exp)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .map(|row| row + "\n")
        .collect()
}

fn batch_to_csv(batch: &SampleBatch) -> String {
    log::trace!("Formatting {} samples as CSV", batch.len());
    let mut csv = String::from("t,ax,ay,az\n");
    for (t, s) in batch.rows() {
        csv += &format!("{t},{},{},{}\n", s.x, s.y, s.z);
    }
    csv
}

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Axis bounds that still make a visible range when every value is the same
fn padded_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
        (min.min(v), max.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(1.0e-3);
    (min - pad, max + pad)
}

fn draw_batch<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    batch: &SampleBatch,
    timestamp: OffsetDateTime,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let root = root.titled(
        &format!(
            "{} samples taken at {}",
            batch.len(),
            timestamp.format(TIMESTAMP_FORMAT)?
        ),
        ("sans-serif", 30),
    )?;

    let t_end = batch.t.last().copied().unwrap_or(0.0).max(1.0e-3);
    let axes: [(&str, fn(&accel_adxl345::Sample) -> f64, RGBColor); 3] = [
        ("ax", |s| s.x, RED),
        ("ay", |s| s.y, GREEN),
        ("az", |s| s.z, BLUE),
    ];

    for (area, (name, value, color)) in root.split_evenly((3, 1)).iter().zip(axes) {
        log::trace!("Drawing {name} chart");
        let (y_min, y_max) = padded_bounds(batch.samples.iter().map(value));
        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 30)
            .build_cartesian_2d(0.0..t_end, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_desc("t, s")
            .y_desc(name)
            .draw()?;

        chart.draw_series(LineSeries::new(
            batch.rows().map(|(t, s)| (t, value(s))),
            color,
        ))?;
    }

    log::trace!("Pushing chart to rendering backend");
    root.present()?;
    Ok(())
}

impl Output {
    pub fn write_batch(&self, batch: &SampleBatch) -> Result<()> {
        log::debug!("Saving {} samples to {:?}", batch.len(), self.output);
        match self.format {
            OutputFormat::Chart => {
                let root =
                    BitMapBackend::new(self.output.as_path(), (1280, 960)).into_drawing_area();
                draw_batch(&root, batch, OffsetDateTime::now_local()?)?;
            }
            OutputFormat::Table => {
                let mut out = BufWriter::new(File::create(self.output.as_path())?);
                out.write_all(batch_to_table(batch).as_bytes())?;
                out.flush()?;
            }
            OutputFormat::Csv => {
                let mut out = BufWriter::new(File::create(self.output.as_path())?);
                out.write_all(batch_to_csv(batch).as_bytes())?;
                out.flush()?;
            }
        };
        Ok(())
    }
}

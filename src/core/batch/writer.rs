use super::PulseRecord;
use crate::core::pulse::error::Result;
use log::info;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Writes all records as one pretty-printed JSON array.
pub fn write_json_records(path: impl AsRef<Path>, records: &[PulseRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!("💾 Saved {} pulse records to {:?}", records.len(), path);
    Ok(())
}

pub fn read_json_records(path: impl AsRef<Path>) -> Result<Vec<PulseRecord>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Replaces `path` with a single comma-separated row.
pub fn write_csv_row(path: impl AsRef<Path>, signal: &[f64]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_row(&mut writer, signal)?;
    writer.flush()?;
    Ok(())
}

/// Appends one row, creating the file when needed.
pub fn append_csv_row(path: impl AsRef<Path>, signal: &[f64]) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    write_row(&mut writer, signal)?;
    writer.flush()?;
    Ok(())
}

fn write_row(writer: &mut impl Write, signal: &[f64]) -> std::io::Result<()> {
    for (i, value) in signal.iter().enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        write!(writer, "{value}")?;
    }
    writer.write_all(b"\r\n")
}

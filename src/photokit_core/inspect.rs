use crate::photokit_core::error::{PhotokitError, Result};
use crate::photokit_core::metadata::{MetadataRecord, MetadataTool, value_to_string};
use std::io::{self, Write};
use std::path::Path;

/// Read every metadata field of `path` and print it to `out`, one `key: value` per line.
pub fn extract_exif<T, W>(tool: &mut T, path: &Path, out: &mut W) -> Result<MetadataRecord>
where
    T: MetadataTool + ?Sized,
    W: Write,
{
    if !path.is_file() {
        return Err(PhotokitError::NotFound(path.to_path_buf()));
    }

    let record = tool.read_metadata(path)?;
    print_record(path, &record, out)?;

    Ok(record)
}

fn print_record<W: Write>(path: &Path, record: &MetadataRecord, out: &mut W) -> io::Result<()> {
    writeln!(out, "=== {} ===", path.display())?;
    for (key, value) in record.iter() {
        writeln!(out, "{}: {}", key, value_to_string(value).unwrap_or_default())?;
    }
    writeln!(out)
}

/// Print the metadata of `path`, reporting any failure as a console message.
///
/// A missing file or unreadable metadata is not an error for the caller: the
/// diagnostic goes to `out` and the function returns normally.
pub fn report_exif<T, W, F>(path: &Path, out: &mut W, open_tool: F) -> io::Result<()>
where
    T: MetadataTool,
    W: Write,
    F: FnOnce() -> Result<T>,
{
    if !path.is_file() {
        writeln!(out, "File not found: {}", path.display())?;
        return Ok(());
    }

    match open_tool().and_then(|mut tool| tool.read_metadata(path)) {
        Ok(record) => {
            print_record(path, &record, out)?;
            log::debug!("Printed {} fields for {}", record.len(), path.display());
        }
        Err(e) => {
            log::warn!("Metadata read failed for {}: {}", path.display(), e);
            writeln!(out, "Could not read EXIF data: {}", e)?;
        }
    }

    Ok(())
}

use crate::photokit_core::error::{PhotokitError, Result};
use exif::{In, Reader, Tag, Value};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use time::{Date, PrimitiveDateTime};

/// Date format used in EXIF data.
const EXIF_DATE_FORMAT: &[time::format_description::FormatItem] =
    time::macros::format_description!("[year]:[month]:[day] [hour]:[minute]:[second]");

/// Capture date format returned by [`get_image_date`].
pub const CAPTURE_DATE_FORMAT: &[time::format_description::FormatItem] =
    time::macros::format_description!("[year]-[month]-[day]");

/// Tags holding the capture date, in priority order. `DateTime` is the tag
/// exiftool reports as ModifyDate.
const DATE_TAGS: &[Tag] = &[Tag::DateTimeOriginal, Tag::DateTime];

/// Result of organizing a folder.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    pub moved: Vec<(PathBuf, PathBuf)>,
    pub skipped: Vec<PathBuf>,
}

/// Read the capture date embedded in an image.
///
/// `DateTimeOriginal` wins when present; `DateTime` is only consulted when the
/// former is missing altogether.
pub fn read_capture_date(path: &Path) -> Result<Date> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif = Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| PhotokitError::metadata(path, e))?;

    let raw = DATE_TAGS
        .iter()
        .find_map(|tag| exif.get_field(*tag, In::PRIMARY))
        .and_then(|field| match &field.value {
            Value::Ascii(parts) => parts
                .first()
                .map(|s| String::from_utf8_lossy(s).into_owned()),
            _ => None,
        })
        .ok_or_else(|| PhotokitError::DateUnresolvable(path.to_path_buf()))?;

    log::trace!("EXIF date for {}: {}", path.display(), raw);
    parse_exif_date(&raw).ok_or_else(|| PhotokitError::DateUnresolvable(path.to_path_buf()))
}

/// Capture date of an image as `YYYY-MM-DD`, or `None` if it cannot be determined.
pub fn get_image_date(path: &Path) -> Option<String> {
    match read_capture_date(path) {
        Ok(date) => date.format(CAPTURE_DATE_FORMAT).ok(),
        Err(PhotokitError::DateUnresolvable(_)) => None,
        Err(e) => {
            log::warn!("Could not read EXIF data of {}: {}", path.display(), e);
            None
        }
    }
}

fn parse_exif_date(s: &str) -> Option<Date> {
    PrimitiveDateTime::parse(s.trim_end_matches('\0'), EXIF_DATE_FORMAT)
        .ok()
        .map(|dt| dt.date())
}

/// `<source>/<YYYY>/<YYYY>_<MM>`
pub fn target_folder(source_folder: &Path, date: Date) -> PathBuf {
    let year = date.year();
    source_folder
        .join(format!("{:04}", year))
        .join(format!("{:04}_{:02}", year, date.month() as u8))
}

/// Move every dated file directly inside `source_folder` into `<year>/<year>_<month>/`.
///
/// Only immediate children are considered, so running this on an organized
/// folder moves nothing. Files without a capture date stay where they are.
/// Moves are not rolled back if a later file fails.
pub fn organize_photos(source_folder: &Path, dry_run: bool) -> Result<OrganizeReport> {
    if !source_folder.exists() {
        return Err(PhotokitError::NotFound(source_folder.to_path_buf()));
    }
    if !source_folder.is_dir() {
        return Err(PhotokitError::NotADirectory(source_folder.to_path_buf()));
    }

    if dry_run {
        println!("DRY RUN - no files will be moved");
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(source_folder)?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", source_folder.display(), e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let mut report = OrganizeReport::default();

    for path in entries {
        let filename = path.file_name().unwrap_or_default().to_os_string();
        let display_name = filename.to_string_lossy();

        let date = get_image_date(&path)
            .and_then(|s| Date::parse(&s, CAPTURE_DATE_FORMAT).ok());
        let Some(date) = date else {
            println!("Warning: no capture date for {}, skipping", display_name);
            report.skipped.push(path);
            continue;
        };

        let folder = target_folder(source_folder, date);
        let target = folder.join(&filename);

        if dry_run {
            println!("Would move {} to {}", display_name, folder.display());
        } else {
            fs::create_dir_all(&folder)?;
            move_file(&path, &target)?;
            println!("Moved {} to {}", display_name, folder.display());
        }

        report.moved.push((path, target));
    }

    log::info!(
        "Organized {}: {} moved, {} skipped",
        source_folder.display(),
        report.moved.len(),
        report.skipped.len()
    );

    Ok(report)
}

/// Rename, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    log::debug!("Rename failed, copying {} to {}", from.display(), to.display());
    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}

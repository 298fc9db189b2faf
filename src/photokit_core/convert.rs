use crate::photokit_core::decode::{CommandDecoder, EncodedJpeg, HeicDecoder};
use crate::photokit_core::error::{PhotokitError, Result};
use crate::photokit_core::metadata::{ExifToolSession, MetadataRecord, MetadataTool};
use crate::photokit_core::profile::TagProfile;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_QUALITY: u8 = 95;

/// What happened to the metadata of a converted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataStatus {
    /// The allow-listed tags were written into the JPEG.
    Embedded { tags: Vec<(String, String)> },
    /// The JPEG was saved without metadata.
    Skipped { reason: String },
}

#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub source: PathBuf,
    pub output: PathBuf,
    pub metadata: MetadataStatus,
}

impl ConversionOutcome {
    pub fn describe(&self) -> String {
        match &self.metadata {
            MetadataStatus::Embedded { .. } => format!("Converted: {}", self.output.display()),
            MetadataStatus::Skipped { .. } => {
                format!("Converted without EXIF data: {}", self.output.display())
            }
        }
    }
}

/// Outcome of a batch run, one entry per `.heic` file found.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<ConversionOutcome>,
    pub failed: Vec<(PathBuf, PhotokitError)>,
}

/// Check whether a path names a HEIC file (case-insensitive `.heic` suffix).
pub fn is_heic(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_lowercase().ends_with(".heic"))
        .unwrap_or(false)
}

/// `<output_dir>/<source stem>.jpg`
pub fn jpeg_output_path(source: &Path, output_dir: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default();
    let mut name = stem.to_os_string();
    name.push(".jpg");
    output_dir.join(name)
}

pub fn validate_quality(quality: u8) -> Result<u8> {
    if (1..=100).contains(&quality) {
        Ok(quality)
    } else {
        Err(PhotokitError::InvalidQuality(quality))
    }
}

/// Converts HEIC files to JPEG, carrying over an allow-list of metadata tags.
pub struct Converter<D, M> {
    decoder: D,
    tool: std::result::Result<M, String>,
    profile: TagProfile,
}

impl Converter<CommandDecoder, ExifToolSession> {
    /// libheif for decoding and exiftool for metadata.
    ///
    /// If exiftool cannot be started, conversions still run and every output
    /// is saved without metadata.
    pub fn with_system_tools(profile: TagProfile) -> Self {
        Converter::new(CommandDecoder::new(), ExifToolSession::new(), profile)
    }
}

impl<D: HeicDecoder, M: MetadataTool> Converter<D, M> {
    pub fn new(decoder: D, tool: Result<M>, profile: TagProfile) -> Self {
        let tool = tool.map_err(|e| {
            log::warn!("Metadata tool unavailable: {}", e);
            e.to_string()
        });
        Converter {
            decoder,
            tool,
            profile,
        }
    }

    pub fn profile(&self) -> &TagProfile {
        &self.profile
    }

    /// Convert one HEIC file to `<output_dir>/<stem>.jpg`.
    ///
    /// `output_dir` defaults to the source's directory and is created if missing.
    /// When the source metadata cannot be read or the tags cannot be written, the
    /// JPEG is still produced, without metadata.
    pub fn heic_to_jpg(
        &mut self,
        path: &Path,
        output_dir: Option<&Path>,
        quality: u8,
    ) -> Result<ConversionOutcome> {
        if !path.is_file() {
            return Err(PhotokitError::NotFound(path.to_path_buf()));
        }
        let quality = validate_quality(quality)?;

        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        if !output_dir.as_os_str().is_empty() {
            fs::create_dir_all(&output_dir)?;
        }

        let raw = self.decoder.decode(path)?;
        log::debug!(
            "Decoded {} ({} {}x{}, stride {})",
            path.display(),
            raw.mode,
            raw.width,
            raw.height,
            raw.stride
        );

        let output = jpeg_output_path(path, &output_dir);
        let record = self.read_source_metadata(path);

        let jpeg = raw.encode_jpeg(path, quality)?;
        drop(raw);

        let metadata = match record {
            Ok(record) => {
                let tags = self.profile.build_tags(&record);
                self.write_output(&output, &jpeg, Some(tags))?
            }
            Err(e) => {
                log::warn!("Could not read EXIF data from {}: {}", path.display(), e);
                self.write_output(&output, &jpeg, None)?;
                MetadataStatus::Skipped {
                    reason: e.to_string(),
                }
            }
        };

        Ok(ConversionOutcome {
            source: path.to_path_buf(),
            output,
            metadata,
        })
    }

    /// Convert every `.heic` file under `input_dir`, recursively.
    ///
    /// With an `output_dir`, the input tree's shape is mirrored beneath it;
    /// otherwise each JPEG lands next to its source. Files are converted one at
    /// a time, and a failed file does not stop the run.
    pub fn batch_convert_heic_to_jpg(
        &mut self,
        input_dir: &Path,
        output_dir: Option<&Path>,
        quality: u8,
    ) -> Result<BatchReport> {
        if !input_dir.is_dir() {
            return Err(PhotokitError::NotADirectory(input_dir.to_path_buf()));
        }
        validate_quality(quality)?;

        let sources: Vec<PathBuf> = WalkDir::new(input_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_heic(path))
            .collect();

        log::info!(
            "Found {} HEIC files under {}",
            sources.len(),
            input_dir.display()
        );

        let bar_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::new(sources.len() as u64).with_style(bar_style);
        bar.set_message("Converting");

        let mut report = BatchReport::default();
        for source in sources {
            let target_dir = mirrored_dir(input_dir, &source, output_dir);

            match self.heic_to_jpg(&source, Some(&target_dir), quality) {
                Ok(outcome) => {
                    bar.println(outcome.describe());
                    report.converted.push(outcome);
                }
                Err(e) => {
                    log::error!("Failed to convert {}: {}", source.display(), e);
                    bar.println(format!("Failed: {}: {}", source.display(), e));
                    report.failed.push((source, e));
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        Ok(report)
    }

    fn read_source_metadata(&mut self, path: &Path) -> Result<MetadataRecord> {
        match self.tool.as_mut() {
            Ok(tool) => tool.read_metadata(path),
            Err(reason) => Err(PhotokitError::metadata(path, reason.clone())),
        }
    }

    /// Write the encoded JPEG and, if given, embed `tags` into it.
    /// A failed tag write leaves the file as a clean copy of `jpeg`.
    fn write_output(
        &mut self,
        output: &Path,
        jpeg: &EncodedJpeg,
        tags: Option<Vec<(String, String)>>,
    ) -> Result<MetadataStatus> {
        fs::write(output, &jpeg.bytes)?;

        let Some(tags) = tags else {
            return Ok(MetadataStatus::Skipped {
                reason: "source metadata unavailable".to_string(),
            });
        };

        let written = match self.tool.as_mut() {
            Ok(tool) => tool.write_tags(output, &tags),
            Err(reason) => Err(PhotokitError::metadata(output, reason.clone())),
        };

        match written {
            Ok(()) => Ok(MetadataStatus::Embedded { tags }),
            Err(e) => {
                log::warn!("Could not write EXIF data to {}: {}", output.display(), e);
                fs::write(output, &jpeg.bytes)?;
                Ok(MetadataStatus::Skipped {
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Directory a converted file goes to, keeping its position relative to `input_dir`.
fn mirrored_dir(input_dir: &Path, source: &Path, output_dir: Option<&Path>) -> PathBuf {
    let parent = source.parent().unwrap_or(input_dir);
    match output_dir {
        None => parent.to_path_buf(),
        Some(out) => match parent.strip_prefix(input_dir) {
            Ok(rel) => out.join(rel),
            Err(_) => out.to_path_buf(),
        },
    }
}

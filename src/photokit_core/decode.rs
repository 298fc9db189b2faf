use crate::photokit_core::error::{PhotokitError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::io;
use std::path::Path;
use std::process::Command;

/// Pixel layout of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    L,
    Rgb,
    Rgba,
}

impl PixelMode {
    pub fn channels(self) -> usize {
        match self {
            PixelMode::L => 1,
            PixelMode::Rgb => 3,
            PixelMode::Rgba => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PixelMode::L => "L",
            PixelMode::Rgb => "RGB",
            PixelMode::Rgba => "RGBA",
        }
    }
}

impl std::fmt::Display for PixelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw decoder output. Rows are `stride` bytes apart; any bytes past
/// `width * channels` in a row are padding.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub mode: PixelMode,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub data: Vec<u8>,
}

/// A JPEG held in memory, ready to be written out.
#[derive(Debug, Clone)]
pub struct EncodedJpeg {
    pub bytes: Vec<u8>,
    pub quality: u8,
}

impl RawImage {
    /// Wrap an already decoded image, with rows packed back to back.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let (mode, data) = match img {
            DynamicImage::ImageLuma8(buf) => (PixelMode::L, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (PixelMode::Rgb, buf.into_raw()),
            other if other.color().has_alpha() => {
                (PixelMode::Rgba, other.into_rgba8().into_raw())
            }
            other => (PixelMode::Rgb, other.into_rgb8().into_raw()),
        };
        RawImage {
            mode,
            width,
            height,
            stride: width as usize * mode.channels(),
            data,
        }
    }

    /// Pixel rows with stride padding removed.
    fn packed_rows(&self, path: &Path) -> Result<Vec<u8>> {
        let row_len = self.width as usize * self.mode.channels();
        if self.stride < row_len {
            return Err(PhotokitError::decode(
                path,
                format!("stride {} shorter than row of {} bytes", self.stride, row_len),
            ));
        }
        let needed = match self.height as usize {
            0 => 0,
            h => self.stride * (h - 1) + row_len,
        };
        if self.data.len() < needed {
            return Err(PhotokitError::decode(
                path,
                format!("buffer holds {} bytes, expected at least {}", self.data.len(), needed),
            ));
        }

        if self.stride == row_len {
            return Ok(self.data[..needed].to_vec());
        }

        let mut packed = Vec::with_capacity(row_len * self.height as usize);
        for row in 0..self.height as usize {
            let start = row * self.stride;
            packed.extend_from_slice(&self.data[start..start + row_len]);
        }
        Ok(packed)
    }

    /// Encode as JPEG at `quality`. Alpha is dropped.
    pub fn encode_jpeg(&self, path: &Path, quality: u8) -> Result<EncodedJpeg> {
        let packed = self.packed_rows(path)?;

        let (pixels, color) = match self.mode {
            PixelMode::L => (packed, ExtendedColorType::L8),
            PixelMode::Rgb => (packed, ExtendedColorType::Rgb8),
            PixelMode::Rgba => (
                packed
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect(),
                ExtendedColorType::Rgb8,
            ),
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality).write_image(
            &pixels,
            self.width,
            self.height,
            color,
        )?;

        Ok(EncodedJpeg { bytes, quality })
    }
}

/// Turns a HEIC file into raw pixels.
pub trait HeicDecoder {
    fn decode(&self, path: &Path) -> Result<RawImage>;
}

/// One decoder invocation: `<program> <args...> <input> <output.png>`.
#[derive(Debug, Clone)]
struct DecoderCommand {
    program: String,
    args: Vec<String>,
}

/// Decodes through libheif's command-line tools.
///
/// The primary image is written to a temporary PNG and loaded from there.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    commands: Vec<DecoderCommand>,
}

impl CommandDecoder {
    pub fn new() -> Self {
        CommandDecoder {
            commands: ["heif-dec", "heif-convert"]
                .into_iter()
                .map(|program| DecoderCommand {
                    program: program.to_string(),
                    args: Vec::new(),
                })
                .collect(),
        }
    }

    /// Use a specific decoder executable instead of searching `heif-dec` / `heif-convert`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self::with_command(program, Vec::<String>::new())
    }

    /// Like [`CommandDecoder::with_program`], with extra arguments placed before
    /// the input and output paths.
    pub fn with_command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandDecoder {
            commands: vec![DecoderCommand {
                program: program.into(),
                args: args.into_iter().map(Into::into).collect(),
            }],
        }
    }
}

impl Default for CommandDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeicDecoder for CommandDecoder {
    fn decode(&self, path: &Path) -> Result<RawImage> {
        let tmp_dir = tempfile::tempdir()?;
        let png_path = tmp_dir.path().join("decoded.png");

        let mut last_err = None;
        for DecoderCommand { program, args } in &self.commands {
            log::debug!("Decoding {} with {}", path.display(), program);
            let output = Command::new(program)
                .args(args)
                .arg(path)
                .arg(&png_path)
                .output();
            match output {
                Ok(out) if out.status.success() && png_path.is_file() => {
                    let img = image::open(&png_path)
                        .map_err(|e| PhotokitError::decode(path, e))?;
                    return Ok(RawImage::from_dynamic(img));
                }
                Ok(out) => {
                    let stderr = String::from_utf8_lossy(&out.stderr);
                    return Err(PhotokitError::decode(
                        path,
                        format!("{} failed: {}", program, stderr.trim()),
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("{} not installed", program);
                    last_err = Some(format!("{} not installed", program));
                }
                Err(e) => return Err(PhotokitError::decode(path, e)),
            }
        }

        Err(PhotokitError::decode(
            path,
            last_err.unwrap_or_else(|| "no HEIC decoder configured".to_string()),
        ))
    }
}

#![allow(dead_code)]

use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use photokit::photokit_core::{
    HeicDecoder, MetadataRecord, MetadataTool, PhotokitError, PixelMode, RawImage, Result,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A small JPEG with no metadata.
pub fn plain_jpeg() -> Vec<u8> {
    let pixels: Vec<u8> = (0..8 * 8 * 3).map(|i| (i * 7 % 256) as u8).collect();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .write_image(&pixels, 8, 8, ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// A small JPEG carrying the given EXIF date fields.
pub fn jpeg_with_exif(date_time_original: Option<&str>, date_time: Option<&str>) -> Vec<u8> {
    let mut fields = Vec::new();
    if let Some(value) = date_time_original {
        fields.push(ascii_field(Tag::DateTimeOriginal, value));
    }
    if let Some(value) = date_time {
        fields.push(ascii_field(Tag::DateTime, value));
    }
    // Keep the EXIF block non-empty even without dates
    fields.push(ascii_field(Tag::Make, "Acme"));

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let jpeg = plain_jpeg();
    let segment_len = (2 + 6 + tiff.len()) as u16;

    let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    out.extend_from_slice(&jpeg[..2]); // SOI
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn ascii_field(tag: Tag, value: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![value.as_bytes().to_vec()]),
    }
}

/// True if the file carries an EXIF block readable by kamadak-exif.
pub fn has_exif(path: &Path) -> bool {
    let file = std::fs::File::open(path).unwrap();
    let mut reader = std::io::BufReader::new(file);
    exif::Reader::new().read_from_container(&mut reader).is_ok()
}

/// Decoder that ignores the file content and returns a fixed gradient.
/// Files whose name contains "corrupt" fail to decode.
pub struct FakeDecoder {
    pub mode: PixelMode,
    pub width: u32,
    pub height: u32,
}

impl Default for FakeDecoder {
    fn default() -> Self {
        FakeDecoder {
            mode: PixelMode::Rgb,
            width: 32,
            height: 24,
        }
    }
}

impl HeicDecoder for FakeDecoder {
    fn decode(&self, path: &Path) -> Result<RawImage> {
        let name = path.file_name().unwrap().to_string_lossy();
        if name.contains("corrupt") {
            return Err(PhotokitError::decode(path, "invalid HEIF box"));
        }

        let channels = self.mode.channels();
        let stride = self.width as usize * channels + 8;
        let mut data = vec![0u8; stride * self.height as usize];
        for y in 0..self.height as usize {
            for x in 0..self.width as usize * channels {
                data[y * stride + x] = ((x * 3 + y * 5) % 256) as u8;
            }
        }
        Ok(RawImage {
            mode: self.mode,
            width: self.width,
            height: self.height,
            stride,
            data,
        })
    }
}

/// Shared view of what a [`FakeTool`] has written.
pub type WrittenTags = Rc<RefCell<HashMap<PathBuf, Vec<(String, String)>>>>;

/// In-memory metadata tool.
pub struct FakeTool {
    pub records: HashMap<PathBuf, MetadataRecord>,
    pub written: WrittenTags,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl FakeTool {
    pub fn new() -> Self {
        FakeTool {
            records: HashMap::new(),
            written: Rc::new(RefCell::new(HashMap::new())),
            fail_reads: false,
            fail_writes: false,
        }
    }

    pub fn with_record(mut self, path: &Path, record: MetadataRecord) -> Self {
        self.records.insert(path.to_path_buf(), record);
        self
    }
}

impl MetadataTool for FakeTool {
    fn read_metadata(&mut self, path: &Path) -> Result<MetadataRecord> {
        if self.fail_reads {
            return Err(PhotokitError::metadata(path, "exiftool crashed"));
        }
        Ok(self.records.get(path).cloned().unwrap_or_default())
    }

    fn write_tags(&mut self, path: &Path, tags: &[(String, String)]) -> Result<()> {
        if self.fail_writes {
            return Err(PhotokitError::metadata(path, "Error: Not a valid JPG"));
        }
        self.written
            .borrow_mut()
            .insert(path.to_path_buf(), tags.to_vec());
        Ok(())
    }
}

pub fn acme_record() -> MetadataRecord {
    let mut record = MetadataRecord::new();
    record.insert("SourceFile", "photo.heic");
    record.insert("EXIF:Make", "Acme");
    record.insert("EXIF:Model", "X1");
    record.insert("EXIF:GPSLatitude", 37.5);
    record.insert("EXIF:GPSLatitudeRef", "North");
    record.insert("EXIF:ModifyDate", "2024:05:21 12:30:00");
    record.insert("EXIF:DateTimeOriginal", "2019:01:01 00:00:00");
    record
}

// Conversion pipeline tests, run against a fake decoder and metadata tool
use assert_fs::prelude::*;
use photokit::photokit_core::{Converter, MetadataStatus, PhotokitError, PixelMode, TagProfile};

mod common;
use common::{FakeDecoder, FakeTool, acme_record, has_exif};

fn tag<'a>(tags: &'a [(String, String)], name: &str) -> &'a str {
    tags.iter()
        .find(|(t, _)| t == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or_else(|| panic!("tag {} not written", name))
}

#[test]
fn test_output_defaults_to_source_directory() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("photo.heic");
    source.write_binary(b"heic").unwrap();

    let mut converter = Converter::new(
        FakeDecoder::default(),
        Ok(FakeTool::new()),
        TagProfile::xiaomi(),
    );
    let outcome = converter.heic_to_jpg(source.path(), None, 95).unwrap();

    assert_eq!(outcome.output, temp_dir.child("photo.jpg").path());
    temp_dir.child("photo.jpg").assert(predicates::path::is_file());

    let decoded = image::open(&outcome.output).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (32, 24));
}

#[test]
fn test_allow_listed_tags_copied_exactly() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("photo.heic");
    source.write_binary(b"heic").unwrap();

    let tool = FakeTool::new().with_record(source.path(), acme_record());
    let written = tool.written.clone();

    let mut converter = Converter::new(FakeDecoder::default(), Ok(tool), TagProfile::xiaomi());
    let outcome = converter.heic_to_jpg(source.path(), None, 95).unwrap();

    let written = written.borrow();
    let tags = written.get(&outcome.output).expect("tags written to the JPEG");
    assert_eq!(tag(tags, "Make"), "Acme");
    assert_eq!(tag(tags, "Model"), "X1");
    assert_eq!(tag(tags, "GPSLatitude"), "37.5");
    assert_eq!(tag(tags, "GPSLatitudeRef"), "North");
    // Fields absent from the source are written as empty strings
    assert_eq!(tag(tags, "FNumber"), "");
    assert_eq!(tags.len(), TagProfile::xiaomi().rules.len());

    assert!(matches!(outcome.metadata, MetadataStatus::Embedded { .. }));
}

#[test]
fn test_date_time_original_taken_from_modify_date_quirk() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("photo.heic");
    source.write_binary(b"heic").unwrap();

    let tool = FakeTool::new().with_record(source.path(), acme_record());
    let written = tool.written.clone();

    let mut converter = Converter::new(FakeDecoder::default(), Ok(tool), TagProfile::standard());
    let outcome = converter.heic_to_jpg(source.path(), None, 95).unwrap();

    let written = written.borrow();
    let tags = &written[&outcome.output];
    assert_eq!(tag(tags, "DateTimeOriginal"), "2024:05:21 12:30:00");
}

#[test]
fn test_tag_write_failure_still_yields_plain_jpeg() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("photo.heic");
    source.write_binary(b"heic").unwrap();

    let mut tool = FakeTool::new().with_record(source.path(), acme_record());
    tool.fail_writes = true;
    let written = tool.written.clone();

    let mut converter = Converter::new(FakeDecoder::default(), Ok(tool), TagProfile::xiaomi());
    let outcome = converter.heic_to_jpg(source.path(), None, 95).unwrap();

    match &outcome.metadata {
        MetadataStatus::Skipped { reason } => assert!(reason.contains("Not a valid JPG")),
        other => panic!("expected skipped metadata, got {:?}", other),
    }
    assert!(written.borrow().is_empty());
    assert!(image::open(&outcome.output).is_ok());
    assert!(!has_exif(&outcome.output));
}

#[test]
fn test_metadata_read_failure_still_yields_plain_jpeg() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("photo.heic");
    source.write_binary(b"heic").unwrap();

    let mut tool = FakeTool::new();
    tool.fail_reads = true;

    let mut converter = Converter::new(FakeDecoder::default(), Ok(tool), TagProfile::xiaomi());
    let outcome = converter.heic_to_jpg(source.path(), None, 95).unwrap();

    assert!(matches!(outcome.metadata, MetadataStatus::Skipped { .. }));
    assert!(image::open(&outcome.output).is_ok());
    assert!(!has_exif(&outcome.output));
}

#[test]
fn test_unavailable_tool_degrades() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("photo.heic");
    source.write_binary(b"heic").unwrap();

    let mut converter: Converter<FakeDecoder, FakeTool> = Converter::new(
        FakeDecoder::default(),
        Err(PhotokitError::metadata("exiftool", "not installed")),
        TagProfile::xiaomi(),
    );
    let outcome = converter.heic_to_jpg(source.path(), None, 95).unwrap();

    match outcome.metadata {
        MetadataStatus::Skipped { reason } => assert!(reason.contains("not installed")),
        other => panic!("expected skipped metadata, got {:?}", other),
    }
}

#[test]
fn test_rgba_source_converts() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("alpha.heic");
    source.write_binary(b"heic").unwrap();

    let decoder = FakeDecoder {
        mode: PixelMode::Rgba,
        ..FakeDecoder::default()
    };
    let mut converter = Converter::new(decoder, Ok(FakeTool::new()), TagProfile::xiaomi());
    let outcome = converter.heic_to_jpg(source.path(), None, 80).unwrap();

    let decoded = image::open(&outcome.output).unwrap();
    assert!(!decoded.color().has_alpha());
}

#[test]
fn test_missing_source_is_not_found() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let mut converter = Converter::new(
        FakeDecoder::default(),
        Ok(FakeTool::new()),
        TagProfile::xiaomi(),
    );

    let result = converter.heic_to_jpg(temp_dir.child("missing.heic").path(), None, 95);
    assert!(matches!(result, Err(PhotokitError::NotFound(_))));
}

#[test]
fn test_invalid_quality_writes_nothing() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("photo.heic");
    source.write_binary(b"heic").unwrap();
    let out = temp_dir.child("out");

    let mut converter = Converter::new(
        FakeDecoder::default(),
        Ok(FakeTool::new()),
        TagProfile::xiaomi(),
    );
    let result = converter.heic_to_jpg(source.path(), Some(out.path()), 0);

    assert!(matches!(result, Err(PhotokitError::InvalidQuality(0))));
    out.assert(predicates::path::missing());
}

#[test]
fn test_output_directory_created() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let source = temp_dir.child("photo.heic");
    source.write_binary(b"heic").unwrap();
    let out = temp_dir.child("converted/nested");

    let mut converter = Converter::new(
        FakeDecoder::default(),
        Ok(FakeTool::new()),
        TagProfile::xiaomi(),
    );
    converter.heic_to_jpg(source.path(), Some(out.path()), 95).unwrap();

    out.child("photo.jpg").assert(predicates::path::is_file());
}

#[test]
fn test_batch_mirrors_relative_directories() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let input = temp_dir.child("in");
    input.child("a/b.heic").write_binary(b"heic").unwrap();
    input.child("top.HEIC").write_binary(b"heic").unwrap();
    input.child("a/c/d.heic").write_binary(b"heic").unwrap();
    input.child("a/notes.txt").write_str("not a photo").unwrap();
    input.child("a/already.jpg").write_binary(b"jpeg").unwrap();
    let output = temp_dir.child("out");

    let mut converter = Converter::new(
        FakeDecoder::default(),
        Ok(FakeTool::new()),
        TagProfile::xiaomi(),
    );
    let report = converter
        .batch_convert_heic_to_jpg(input.path(), Some(output.path()), 95)
        .unwrap();

    assert_eq!(report.converted.len(), 3);
    assert!(report.failed.is_empty());
    output.child("a/b.jpg").assert(predicates::path::is_file());
    output.child("a/c/d.jpg").assert(predicates::path::is_file());
    output.child("top.jpg").assert(predicates::path::is_file());
    output.child("a/notes.jpg").assert(predicates::path::missing());
    output.child("a/already.jpg").assert(predicates::path::missing());
}

#[test]
fn test_batch_without_output_writes_alongside_sources() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    temp_dir.child("x/y.heic").write_binary(b"heic").unwrap();

    let mut converter = Converter::new(
        FakeDecoder::default(),
        Ok(FakeTool::new()),
        TagProfile::xiaomi(),
    );
    converter
        .batch_convert_heic_to_jpg(temp_dir.path(), None, 95)
        .unwrap();

    temp_dir.child("x/y.jpg").assert(predicates::path::is_file());
}

#[test]
fn test_batch_continues_after_decode_failure() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    temp_dir.child("a_corrupt.heic").write_binary(b"junk").unwrap();
    temp_dir.child("b_good.heic").write_binary(b"heic").unwrap();

    let mut converter = Converter::new(
        FakeDecoder::default(),
        Ok(FakeTool::new()),
        TagProfile::xiaomi(),
    );
    let report = converter
        .batch_convert_heic_to_jpg(temp_dir.path(), None, 95)
        .unwrap();

    assert_eq!(report.converted.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, PhotokitError::DecodeFailure { .. }));
    temp_dir.child("b_good.jpg").assert(predicates::path::is_file());
    temp_dir.child("a_corrupt.jpg").assert(predicates::path::missing());
}

#[test]
fn test_batch_requires_directory() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let file = temp_dir.child("photo.heic");
    file.write_binary(b"heic").unwrap();

    let mut converter = Converter::new(
        FakeDecoder::default(),
        Ok(FakeTool::new()),
        TagProfile::xiaomi(),
    );
    let result = converter.batch_convert_heic_to_jpg(file.path(), None, 95);
    assert!(matches!(result, Err(PhotokitError::NotADirectory(_))));
}

pub mod cli;
pub mod convert;
pub mod decode;
pub mod error;
pub mod inspect;
pub mod metadata;
pub mod organize;
pub mod profile;

pub use cli::{Cli, Commands};
pub use convert::{BatchReport, ConversionOutcome, Converter, DEFAULT_QUALITY, MetadataStatus};
pub use decode::{CommandDecoder, EncodedJpeg, HeicDecoder, PixelMode, RawImage};
pub use error::{PhotokitError, Result};
pub use inspect::{extract_exif, report_exif};
pub use metadata::{ExifToolSession, MetadataRecord, MetadataTool, exiftool_available};
pub use organize::{OrganizeReport, get_image_date, organize_photos, read_capture_date};
pub use profile::{BuiltinProfile, TagProfile};

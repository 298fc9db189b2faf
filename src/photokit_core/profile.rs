//! Tag allow-lists used when copying metadata from a HEIC source into the converted JPEG.
//!
//! A [`TagProfile`] is an ordered list of rules. Each rule names the tag to write
//! into the output and where its value comes from: either a field of the source
//! record, or a value derived from several source fields.
//!
//! Profiles can be loaded from TOML:
//!
//! ```toml
//! name = "minimal"
//!
//! [[tags]]
//! target = "Make"
//! source = "EXIF:Make"
//!
//! [[tags]]
//! target = "GPSDateTime"
//! derive = "gps_datetime"
//! ```

use crate::photokit_core::error::{PhotokitError, Result};
use crate::photokit_core::metadata::MetadataRecord;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::Path;

/// Where a rule takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSource {
    /// Copy a single field of the source record.
    Field(String),
    /// Compute the value from several fields.
    Derived(Derivation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    /// `Composite:GPSDateTime`, or `"<GPSDateStamp> <GPSTimeStamp>Z"` when it is absent.
    GpsDatetime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    pub target: String,
    pub source: TagSource,
}

impl TagRule {
    fn field(target: &str, source: &str) -> Self {
        TagRule {
            target: target.to_string(),
            source: TagSource::Field(source.to_string()),
        }
    }

    fn derived(target: &str, derivation: Derivation) -> Self {
        TagRule {
            target: target.to_string(),
            source: TagSource::Derived(derivation),
        }
    }

    fn resolve(&self, record: &MetadataRecord) -> String {
        match &self.source {
            TagSource::Field(field) => record.get_string(field).unwrap_or_default(),
            TagSource::Derived(Derivation::GpsDatetime) => gps_datetime(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagProfile {
    pub name: String,
    pub rules: Vec<TagRule>,
}

/// Profiles compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuiltinProfile {
    /// Camera, exposure and GPS position tags
    Standard,
    /// Standard tags plus Xiaomi model and GPS time tags
    Xiaomi,
}

impl BuiltinProfile {
    pub fn profile(self) -> TagProfile {
        match self {
            BuiltinProfile::Standard => TagProfile::standard(),
            BuiltinProfile::Xiaomi => TagProfile::xiaomi(),
        }
    }
}

impl TagProfile {
    /// Camera, exposure and GPS position tags.
    ///
    /// `DateTimeOriginal` is filled from the source's `ModifyDate`, not its own
    /// `DateTimeOriginal`. Phones that write the capture time only into
    /// `ModifyDate` rely on this.
    pub fn standard() -> Self {
        TagProfile {
            name: "standard".to_string(),
            rules: vec![
                TagRule::field("Make", "EXIF:Make"),
                TagRule::field("Model", "EXIF:Model"),
                TagRule::field("DateTimeOriginal", "EXIF:ModifyDate"),
                TagRule::field("FNumber", "EXIF:FNumber"),
                TagRule::field("ExposureTime", "EXIF:ExposureTime"),
                TagRule::field("ISO", "EXIF:ISO"),
                TagRule::field("FocalLengthIn35mmFormat", "EXIF:FocalLengthIn35mmFormat"),
                TagRule::field("GPSLatitude", "EXIF:GPSLatitude"),
                TagRule::field("GPSLongitude", "EXIF:GPSLongitude"),
                TagRule::field("GPSLatitudeRef", "EXIF:GPSLatitudeRef"),
                TagRule::field("GPSLongitudeRef", "EXIF:GPSLongitudeRef"),
            ],
        }
    }

    /// The standard tags plus `XiaomiModel` and the GPS time fields.
    pub fn xiaomi() -> Self {
        TagProfile {
            name: "xiaomi".to_string(),
            rules: vec![
                TagRule::field("Make", "EXIF:Make"),
                TagRule::field("Model", "EXIF:Model"),
                TagRule::field("XiaomiModel", "EXIF:XiaomiModel"),
                TagRule::field("DateTimeOriginal", "EXIF:ModifyDate"),
                TagRule::field("FNumber", "EXIF:FNumber"),
                TagRule::field("ExposureTime", "EXIF:ExposureTime"),
                TagRule::field("ISO", "EXIF:ISO"),
                TagRule::field("FocalLengthIn35mmFormat", "EXIF:FocalLengthIn35mmFormat"),
                TagRule::field("GPSLatitude", "EXIF:GPSLatitude"),
                TagRule::field("GPSLongitude", "EXIF:GPSLongitude"),
                TagRule::field("GPSLatitudeRef", "EXIF:GPSLatitudeRef"),
                TagRule::field("GPSLongitudeRef", "EXIF:GPSLongitudeRef"),
                TagRule::field("GPSTimeStamp", "EXIF:GPSTimeStamp"),
                TagRule::field("GPSDateStamp", "EXIF:GPSDateStamp"),
                TagRule::derived("GPSDateTime", Derivation::GpsDatetime),
            ],
        }
    }

    /// Build the output tags for `record`, in rule order.
    /// Fields missing from the source become empty strings.
    pub fn build_tags(&self, record: &MetadataRecord) -> Vec<(String, String)> {
        self.rules
            .iter()
            .map(|rule| (rule.target.clone(), rule.resolve(record)))
            .collect()
    }

    /// Parse a profile from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let raw: RawProfile =
            toml::from_str(text).map_err(|e| PhotokitError::Profile(e.to_string()))?;
        raw.try_into()
    }

    /// Load a profile from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PhotokitError::Profile(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }
}

impl Default for TagProfile {
    fn default() -> Self {
        TagProfile::xiaomi()
    }
}

fn gps_datetime(record: &MetadataRecord) -> String {
    let non_empty = |tag: &str| record.get_string(tag).filter(|s| !s.is_empty());

    if let Some(direct) = non_empty("Composite:GPSDateTime") {
        return direct;
    }

    match (non_empty("EXIF:GPSDateStamp"), non_empty("EXIF:GPSTimeStamp")) {
        (Some(date), Some(time)) => format!("{} {}Z", date, time),
        _ => String::new(),
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct RawProfile {
    name: String,
    #[serde(default)]
    tags: Vec<RawRule>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct RawRule {
    target: String,
    source: Option<String>,
    derive: Option<Derivation>,
}

impl TryFrom<RawProfile> for TagProfile {
    type Error = PhotokitError;

    fn try_from(raw: RawProfile) -> Result<Self> {
        if raw.tags.is_empty() {
            return Err(PhotokitError::Profile(format!(
                "profile '{}' has no tags",
                raw.name
            )));
        }

        let rules = raw
            .tags
            .into_iter()
            .map(|rule| {
                let source = match (rule.source, rule.derive) {
                    (Some(field), None) => TagSource::Field(field),
                    (None, Some(derivation)) => TagSource::Derived(derivation),
                    (Some(_), Some(_)) => {
                        return Err(PhotokitError::Profile(format!(
                            "tag '{}' sets both source and derive",
                            rule.target
                        )));
                    }
                    (None, None) => {
                        return Err(PhotokitError::Profile(format!(
                            "tag '{}' needs a source or derive",
                            rule.target
                        )));
                    }
                };
                Ok(TagRule {
                    target: rule.target,
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TagProfile {
            name: raw.name,
            rules,
        })
    }
}

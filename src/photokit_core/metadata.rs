use crate::photokit_core::error::{PhotokitError, Result};
use exiftool::ExifTool;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Full metadata of one file, keyed by group-prefixed tag name (`EXIF:Make`).
/// Field order is the order reported by the metadata tool.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct MetadataRecord(Map<String, Value>);

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(tag.into(), value.into());
    }

    pub fn get(&self, tag: &str) -> Option<&Value> {
        self.0.get(tag)
    }

    /// Value of `tag` rendered as text, or `None` if the tag is absent.
    pub fn get_string(&self, tag: &str) -> Option<String> {
        self.0.get(tag).and_then(value_to_string)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        MetadataRecord(iter.into_iter().collect())
    }
}

/// Render a metadata value the way it would be handed back to the tool.
pub fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(_) => Some(v.to_string()),
    }
}

/// Reads and writes embedded metadata of files on disk.
pub trait MetadataTool {
    /// Read every metadata field of `path`.
    fn read_metadata(&mut self, path: &Path) -> Result<MetadataRecord>;

    /// Write `tags` into `path` in place. No backup of the previous file is kept.
    fn write_tags(&mut self, path: &Path, tags: &[(String, String)]) -> Result<()>;
}

/// Arguments used for every metadata read.
pub const READ_ARGS: [&str; 2] = ["-G", "-n"];

/// A persistent exiftool process.
pub struct ExifToolSession {
    exiftool: ExifTool,
}

impl ExifToolSession {
    pub fn new() -> Result<Self> {
        let exiftool = ExifTool::new().map_err(|e| {
            PhotokitError::metadata("exiftool", format!("failed to start exiftool: {}", e))
        })?;
        Ok(ExifToolSession { exiftool })
    }
}

impl MetadataTool for ExifToolSession {
    fn read_metadata(&mut self, path: &Path) -> Result<MetadataRecord> {
        // -G prefixes each key with its group name, -n keeps raw numeric values
        self.exiftool
            .read_metadata::<MetadataRecord>(path, &READ_ARGS)
            .map_err(|e| PhotokitError::metadata(path, e))
    }

    fn write_tags(&mut self, path: &Path, tags: &[(String, String)]) -> Result<()> {
        let path_str = path
            .to_str()
            .ok_or_else(|| PhotokitError::metadata(path, "path is not valid UTF-8"))?;

        let args = write_args(path_str, tags);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        log::debug!("exiftool {}", arg_refs.join(" "));

        self.exiftool
            .execute_raw(&arg_refs[..])
            .map(|_| ())
            .map_err(|e| PhotokitError::metadata(path, e))
    }
}

/// Command line for writing `tags` into `path`, overwriting it in place.
fn write_args(path: &str, tags: &[(String, String)]) -> Vec<String> {
    let mut args: Vec<String> = Vec::with_capacity(tags.len() + 3);
    args.push("-overwrite_original".to_string());
    // Values were read with -n, so they are written back unconverted
    args.push("-n".to_string());
    for (tag, value) in tags {
        args.push(format!("-{}={}", tag, value));
    }
    args.push(path.to_string());
    args
}

/// Check if exiftool is available on the system.
pub fn exiftool_available() -> bool {
    std::process::Command::new("exiftool")
        .arg("-ver")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

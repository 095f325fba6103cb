//! Collection file codec.
//!
//! A collection file is a line-oriented list of image paths:
//!
//! ```text
//! #Gallerist collection
//! #created with gallerist version 0.1.0
//! #geometry: 10 20 640 480
//! "/photos/a.jpg"
//! "/photos/b.jpg"
//! #end
//! ```
//!
//! Comment lines other than the marker and the geometry line are ignored on
//! read. Lines without quotes are accepted up to the first space for
//! compatibility with older files.

use std::borrow::Cow;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::CollectionError;

/// Marker prefix identifying files written by a collection-aware tool.
pub const COLLECTION_MARKER: &str = "#Gallerist";

/// Marker written by Geeqie, whose collection files share this format.
const GEEQIE_MARKER: &str = "#Geeqie";

/// Unofficial files are only rejected past this many invalid paths.
const FAIL_MIN: usize = 300;
/// Percentage of invalid paths above which an unofficial file is rejected.
const FAIL_PERCENT: usize = 98;

/// Saved window placement of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Geometry {
    fn parse(text: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(text).ok()?;
        let mut fields = text.split_whitespace().map(|f| f.parse::<i32>());
        let x = fields.next()?.ok()?;
        let y = fields.next()?.ok()?;
        let w = fields.next()?.ok()?;
        let h = fields.next()?.ok()?;
        Some(Self { x, y, w, h })
    }
}

/// In-memory contents of a collection file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFile {
    /// Listed image paths, in file order.
    pub paths: Vec<PathBuf>,
    /// Window geometry, if the file recorded one.
    pub geometry: Option<Geometry>,
    /// Whether the file carried the collection marker line.
    pub official: bool,
}

impl CollectionFile {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection from a list of paths.
    pub fn from_paths(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            geometry: None,
            official: true,
        }
    }

    /// Parse the raw contents of a collection file.
    ///
    /// Paths are taken byte for byte, so names that are not valid UTF-8
    /// survive a load and save. Official files keep every absolute path,
    /// whether or not it exists. Unofficial files drop paths that do not
    /// exist and are rejected once nearly all of a large file turns out to
    /// be invalid.
    pub fn parse(data: impl AsRef<[u8]>, source: &Path) -> Result<Self, CollectionError> {
        let mut collection = Self::new();
        let mut total = 0usize;
        let mut invalid = 0usize;

        for line in data.as_ref().split(|&b| b == b'\n') {
            let line = match line.last() {
                Some(b'\r') => &line[..line.len() - 1],
                _ => line,
            };
            if line.first() == Some(&b'#') {
                if starts_with_ignore_case(line, COLLECTION_MARKER)
                    || starts_with_ignore_case(line, GEEQIE_MARKER)
                {
                    collection.official = true;
                } else if let Some(rest) = line.strip_prefix(b"#geometry:".as_slice()) {
                    if let Some(geometry) = Geometry::parse(rest) {
                        collection.geometry = Some(geometry);
                    }
                }
                continue;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let Some(value) = quoted_value(line) else {
                continue;
            };

            total += 1;
            let path = path_from_bytes(value);
            let valid = path.is_absolute() && (collection.official || path.exists());
            if valid {
                collection.paths.push(path);
            } else if !collection.official {
                invalid += 1;
                if invalid > FAIL_MIN && invalid * 100 / total > FAIL_PERCENT {
                    return Err(CollectionError::TooManyInvalid {
                        path: source.to_path_buf(),
                        invalid,
                        total,
                    });
                }
            }
        }

        Ok(collection)
    }

    /// Render the collection in the on-disk format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let _ = writeln!(out, "{COLLECTION_MARKER} collection");
        let _ = writeln!(out, "#created with gallerist version {}", env!("CARGO_PKG_VERSION"));
        if let Some(g) = self.geometry {
            let _ = writeln!(out, "#geometry: {} {} {} {}", g.x, g.y, g.w, g.h);
        }
        for path in &self.paths {
            out.push(b'"');
            out.extend_from_slice(&path_bytes(path));
            out.extend_from_slice(b"\"\n");
        }
        out.extend_from_slice(b"#end\n");
        out
    }

    /// Number of listed paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if the collection lists nothing.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn starts_with_ignore_case(line: &[u8], prefix: &str) -> bool {
    line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Extract the value of a collection line.
///
/// Returns the bytes between the first pair of double quotes, or for unquoted
/// lines everything up to the first space.
fn quoted_value(line: &[u8]) -> Option<&[u8]> {
    if let Some(start) = line.iter().position(|&b| b == b'"') {
        let rest = &line[start + 1..];
        let end = rest.iter().position(|&b| b == b'"')?;
        let value = &rest[..end];
        return (!value.is_empty()).then_some(value);
    }

    let end = line
        .iter()
        .position(|&b| b == b' ' || b == 0x08)
        .unwrap_or(line.len());
    let value = &line[..end];
    (!value.is_empty()).then_some(value)
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

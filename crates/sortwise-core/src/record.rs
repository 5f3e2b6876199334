//! Per-file records and the extension to category mapping.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};

/// Coarse file category, derived purely from the extension.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FileCategory {
    /// Images, video and audio.
    Media,
    /// Text, office documents, spreadsheets and presentations.
    Document,
    /// Source code and structured data.
    Code,
    /// Compressed archives.
    Archive,
    /// Installers, binaries and shared libraries.
    Executable,
    /// Anything else, including files without an extension.
    Other,
}

impl FileCategory {
    /// Map a normalized (lower-case, no leading dot) extension to a category.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            // images
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" | "tif" | "webp" | "svg" | "ico"
            | "raw" | "cr2" | "nef" | "arw" | "dng" | "heic"
            // video
            | "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg"
            | "3gp"
            // audio
            | "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" | "opus" => Self::Media,

            "pdf" | "doc" | "docx" | "txt" | "rtf" | "odt" | "pages" | "md" | "xls" | "xlsx"
            | "csv" | "ods" | "numbers" | "ppt" | "pptx" | "odp" | "key" => Self::Document,

            "py" | "js" | "ts" | "html" | "css" | "cpp" | "c" | "h" | "java" | "sql" | "json"
            | "xml" | "php" | "rb" | "go" | "rs" | "swift" | "kt" | "sh" => Self::Code,

            "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "tgz" => Self::Archive,

            "exe" | "msi" | "deb" | "rpm" | "dmg" | "app" | "appx" | "dll" | "so" => {
                Self::Executable
            }

            _ => Self::Other,
        }
    }
}

/// Normalized extension of a path: lower-case, without the leading dot.
///
/// Returns an empty string when the file has no extension.
pub fn normalized_extension(path: &Path) -> CompactString {
    path.extension()
        .map(|ext| CompactString::new(ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A regular file seen during a scan. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Full path of the file.
    #[serde(serialize_with = "crate::serde_path::lossy")]
    pub path: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Normalized extension (may be empty).
    pub extension: CompactString,
    /// Category derived from the extension.
    pub category: FileCategory,
}

impl FileRecord {
    /// Create a record, deriving extension and category from the path.
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64, modified: SystemTime) -> Self {
        let path = path.into();
        let extension = normalized_extension(&path);
        let category = FileCategory::from_extension(&extension);
        Self {
            path,
            size_bytes,
            modified,
            extension,
            category,
        }
    }

    /// Directory that directly contains this file.
    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        assert_eq!(FileCategory::from_extension("jpg"), FileCategory::Media);
        assert_eq!(FileCategory::from_extension("flac"), FileCategory::Media);
        assert_eq!(FileCategory::from_extension("pdf"), FileCategory::Document);
        assert_eq!(FileCategory::from_extension("xlsx"), FileCategory::Document);
        assert_eq!(FileCategory::from_extension("rs"), FileCategory::Code);
        assert_eq!(FileCategory::from_extension("7z"), FileCategory::Archive);
        assert_eq!(FileCategory::from_extension("exe"), FileCategory::Executable);
        assert_eq!(FileCategory::from_extension("ttf"), FileCategory::Other);
        assert_eq!(FileCategory::from_extension(""), FileCategory::Other);
    }

    #[test]
    fn test_record_derives_extension() {
        let record = FileRecord::new("/photos/IMG_0001.JPG", 2048, SystemTime::UNIX_EPOCH);
        assert_eq!(record.extension, "jpg");
        assert_eq!(record.category, FileCategory::Media);
        assert_eq!(record.parent(), Some(Path::new("/photos")));
    }

    #[test]
    fn test_record_without_extension() {
        let record = FileRecord::new("/etc/hostname", 12, SystemTime::UNIX_EPOCH);
        assert!(record.extension.is_empty());
        assert_eq!(record.category, FileCategory::Other);
    }

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(hash.to_hex().len(), 64);
        assert!(hash.to_string().starts_with("abab"));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(FileCategory::Executable.to_string(), "executable");
        assert_eq!(FileCategory::Media.as_ref(), "media");
    }
}

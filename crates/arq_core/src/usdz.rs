//! USDZ packaging.
//!
//! A USDZ file is a ZIP archive with extra layout rules:
//!
//! - every entry is stored, never compressed
//! - the first entry is the root USD layer
//! - every entry's data starts at a multiple of 64 bytes from the start of
//!   the file, so viewers can map it directly
//!
//! Archives are built and read entirely in memory.

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::usd::{parse_usda, ParseError, UsdLayer};

/// Media type of a USDZ package, for transport layers.
pub const USDZ_MEDIA_TYPE: &str = "model/vnd.usdz+zip";

/// Required data alignment in bytes.
pub const USDZ_ALIGNMENT: u16 = 64;

/// Name of the root layer entry.
pub const DEFAULT_LAYER_NAME: &str = "model.usda";

/// Errors that can occur while building or reading a package.
#[derive(Error, Debug)]
pub enum UsdzError {
    #[error("USDZ archive error: {0}")]
    Packaging(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entry {0} is compressed; USDZ entries must be stored")]
    CompressedEntry(String),

    #[error("Archive has no entries")]
    EmptyArchive,

    #[error("Invalid entry name {0:?}")]
    InvalidEntryName(String),

    #[error("Duplicate entry {0}")]
    DuplicateEntry(String),

    #[error("Root layer: {0}")]
    Layer(#[from] ParseError),

    #[error("Root layer has no default prim, or it does not exist")]
    MissingDefaultPrim,

    #[error("Entry {name} data starts at offset {offset}, not a multiple of 64")]
    Misaligned { name: String, offset: u64 },

    #[error("First entry {0} is not a USDA layer")]
    NotUsdLayer(String),
}

/// Result type for packaging operations.
pub type UsdzResult<T> = Result<T, UsdzError>;

/// Entry data alignment policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// 64-byte aligned entry data, as the USDZ profile requires
    #[default]
    Strict,

    /// No padding; plain ZIP layout
    None,
}

/// How [`package`] lays out the archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageOptions {
    pub alignment: Alignment,

    /// Name of the root layer entry
    pub layer_name: String,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            alignment: Alignment::Strict,
            layer_name: DEFAULT_LAYER_NAME.to_string(),
        }
    }
}

/// One file in the package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsdzEntry {
    /// Relative path inside the archive
    pub name: String,

    pub data: Vec<u8>,

    /// Offset of the data in the archive; known once written or read
    pub data_offset: Option<u64>,
}

impl UsdzEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            data_offset: None,
        }
    }
}

/// An ordered set of entries, root layer first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsdzPackage {
    pub entries: Vec<UsdzEntry>,
    pub alignment: Alignment,
}

/// Wrap a root layer into a package.
pub fn package(layer: Vec<u8>, options: &PackageOptions) -> UsdzResult<UsdzPackage> {
    check_entry_name(&options.layer_name)?;

    Ok(UsdzPackage {
        entries: vec![UsdzEntry::new(options.layer_name.clone(), layer)],
        alignment: options.alignment,
    })
}

impl UsdzPackage {
    /// The first entry, which viewers open.
    pub fn root_layer(&self) -> Option<&UsdzEntry> {
        self.entries.first()
    }

    /// Append an auxiliary file (texture, sublayer).
    pub fn push_entry(&mut self, name: impl Into<String>, data: Vec<u8>) -> UsdzResult<()> {
        let name = name.into();
        check_entry_name(&name)?;
        if self.entries.iter().any(|e| e.name == name) {
            return Err(UsdzError::DuplicateEntry(name));
        }

        self.entries.push(UsdzEntry::new(name, data));
        Ok(())
    }

    /// Write the archive.
    ///
    /// Timestamps are fixed at 1980-01-01, so equal packages give equal bytes.
    pub fn to_bytes(&self) -> UsdzResult<Vec<u8>> {
        let mut options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(DateTime::default());
        if self.alignment == Alignment::Strict {
            options = options.with_alignment(USDZ_ALIGNMENT);
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            writer.start_file(entry.name.as_str(), options.clone())?;
            writer.write_all(&entry.data)?;
        }
        let bytes = writer.finish()?.into_inner();

        log::debug!(
            "Packaged {} entries into {} bytes ({:?} alignment)",
            self.entries.len(),
            bytes.len(),
            self.alignment
        );

        Ok(bytes)
    }

    /// Read a package back.
    ///
    /// Rejects empty archives and compressed entries. The alignment is
    /// [`Alignment::Strict`] when every entry's data is 64-byte aligned.
    pub fn read(bytes: &[u8]) -> UsdzResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        if archive.is_empty() {
            return Err(UsdzError::EmptyArchive);
        }

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            // Raw access: compressed data is rejected, never inflated
            let mut file = archive.by_index_raw(index)?;
            let name = file.name().to_string();
            if file.compression() != CompressionMethod::Stored {
                return Err(UsdzError::CompressedEntry(name));
            }

            let declared = file.size();
            let data = read_entry_data(&mut file, declared, bytes.len())?;

            entries.push(UsdzEntry {
                name,
                data,
                data_offset: Some(file.data_start()),
            });
        }

        let aligned = entries
            .iter()
            .all(|e| e.data_offset.map_or(true, |o| o % USDZ_ALIGNMENT as u64 == 0));

        Ok(Self {
            entries,
            alignment: if aligned { Alignment::Strict } else { Alignment::None },
        })
    }

    /// Check the USDZ layout rules and return the parsed root layer.
    ///
    /// The first entry must be a USDA layer that parses and whose default
    /// prim exists. With [`Alignment::Strict`], every entry with a known
    /// offset must be 64-byte aligned.
    pub fn validate(&self, alignment: Alignment) -> UsdzResult<UsdLayer> {
        let root = self.root_layer().ok_or(UsdzError::EmptyArchive)?;
        if !root.name.ends_with(".usda") {
            return Err(UsdzError::NotUsdLayer(root.name.clone()));
        }

        if alignment == Alignment::Strict {
            for entry in &self.entries {
                if let Some(offset) = entry.data_offset {
                    if offset % USDZ_ALIGNMENT as u64 != 0 {
                        return Err(UsdzError::Misaligned {
                            name: entry.name.clone(),
                            offset,
                        });
                    }
                }
            }
        }

        let text = std::str::from_utf8(&root.data)
            .map_err(|_| UsdzError::NotUsdLayer(format!("{} (not UTF-8 text)", root.name)))?;
        let layer = parse_usda(text)?;
        if layer.default_prim().is_none() {
            return Err(UsdzError::MissingDefaultPrim);
        }

        Ok(layer)
    }
}

/// Read one entry's data. The declared size only sizes the buffer up front,
/// and never beyond the archive itself.
fn read_entry_data(reader: &mut impl Read, declared: u64, archive_len: usize) -> UsdzResult<Vec<u8>> {
    let capacity = usize::try_from(declared).map_or(archive_len, |size| size.min(archive_len));
    let mut data = Vec::with_capacity(capacity);
    reader.read_to_end(&mut data)?;
    Ok(data)
}

/// Entry names are relative, forward-slash paths without `..`.
fn check_entry_name(name: &str) -> UsdzResult<()> {
    let invalid = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.contains(':')
        || name.split('/').any(|part| part.is_empty() || part == "." || part == "..");

    if invalid {
        Err(UsdzError::InvalidEntryName(name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYER: &str = "#usda 1.0\n(\n    defaultPrim = \"Root\"\n)\n\ndef Xform \"Root\"\n{\n}\n";

    fn layer_package(options: &PackageOptions) -> UsdzPackage {
        package(LAYER.as_bytes().to_vec(), options).unwrap()
    }

    #[test]
    fn test_single_stored_entry() {
        let bytes = layer_package(&PackageOptions::default()).to_bytes().unwrap();
        let read = UsdzPackage::read(&bytes).unwrap();

        assert_eq!(read.entries.len(), 1);
        assert_eq!(read.entries[0].name, "model.usda");
        assert_eq!(read.entries[0].data, LAYER.as_bytes());
        assert_eq!(read.alignment, Alignment::Strict);
        assert_eq!(read.entries[0].data_offset.unwrap() % 64, 0);
    }

    #[test]
    fn test_bytes_are_deterministic() {
        let package = layer_package(&PackageOptions::default());
        assert_eq!(package.to_bytes().unwrap(), package.to_bytes().unwrap());
    }

    #[test]
    fn test_every_entry_aligned() {
        let mut package = layer_package(&PackageOptions::default());
        package.push_entry("textures/a.png", vec![1; 7]).unwrap();
        package.push_entry("textures/b.png", vec![2; 61]).unwrap();

        let read = UsdzPackage::read(&package.to_bytes().unwrap()).unwrap();

        assert_eq!(read.entries.len(), 3);
        for entry in &read.entries {
            assert_eq!(entry.data_offset.unwrap() % 64, 0, "{}", entry.name);
        }
        assert!(read.validate(Alignment::Strict).is_ok());
    }

    #[test]
    fn test_unaligned_layout() {
        let options = PackageOptions {
            alignment: Alignment::None,
            ..Default::default()
        };
        let bytes = layer_package(&options).to_bytes().unwrap();
        let read = UsdzPackage::read(&bytes).unwrap();

        assert!(read.validate(Alignment::None).is_ok());
        assert!(matches!(
            read.validate(Alignment::Strict),
            Err(UsdzError::Misaligned { .. })
        ));
    }

    #[test]
    fn test_push_entry_rejects_bad_names() {
        let mut package = layer_package(&PackageOptions::default());

        for name in ["", "/abs.png", "../up.png", "a//b.png", "c:\\x.png", "./a.png"] {
            assert!(
                matches!(package.push_entry(name, vec![]), Err(UsdzError::InvalidEntryName(_))),
                "{name}"
            );
        }
        assert!(matches!(
            package.push_entry("model.usda", vec![]),
            Err(UsdzError::DuplicateEntry(_))
        ));
    }

    #[test]
    fn test_empty_archive() {
        let bytes = ZipWriter::new(Cursor::new(Vec::new()))
            .finish()
            .unwrap()
            .into_inner();
        assert!(matches!(UsdzPackage::read(&bytes), Err(UsdzError::EmptyArchive)));
    }

    #[test]
    fn test_compressed_entry_is_rejected() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file("model.usda", options).unwrap();
        writer.write_all(LAYER.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(matches!(
            UsdzPackage::read(&bytes),
            Err(UsdzError::CompressedEntry(name)) if name == "model.usda"
        ));
    }

    #[test]
    fn test_declared_size_is_not_trusted() {
        let mut reader = Cursor::new(LAYER.as_bytes());
        let data = read_entry_data(&mut reader, u64::MAX, 128).unwrap();

        assert_eq!(data, LAYER.as_bytes());
        assert!(data.capacity() <= 128);
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            UsdzPackage::read(b"definitely not a zip archive"),
            Err(UsdzError::Packaging(_))
        ));
    }

    #[test]
    fn test_validate_layer() {
        let good = layer_package(&PackageOptions::default());
        let layer = good.validate(Alignment::Strict).unwrap();
        assert_eq!(layer.metadata.default_prim.as_deref(), Some("Root"));

        let missing = package(
            b"#usda 1.0\n(\n    defaultPrim = \"Nope\"\n)\n".to_vec(),
            &PackageOptions::default(),
        )
        .unwrap();
        assert!(matches!(
            missing.validate(Alignment::Strict),
            Err(UsdzError::MissingDefaultPrim)
        ));

        let wrong_first = UsdzPackage {
            entries: vec![UsdzEntry::new("texture.png", vec![0; 4])],
            alignment: Alignment::Strict,
        };
        assert!(matches!(
            wrong_first.validate(Alignment::Strict),
            Err(UsdzError::NotUsdLayer(_))
        ));

        let broken = package(b"not usda".to_vec(), &PackageOptions::default()).unwrap();
        assert!(matches!(broken.validate(Alignment::Strict), Err(UsdzError::Layer(_))));
    }

    #[test]
    fn test_layer_name_is_checked() {
        let options = PackageOptions {
            layer_name: "../model.usda".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            package(Vec::new(), &options),
            Err(UsdzError::InvalidEntryName(_))
        ));
    }
}

//! Minimal `resources.arsc` reader.
//!
//! Only entry names are decoded, which is enough to turn a numeric
//! resource ID into `type/name`. Values and configurations are ignored;
//! the first configuration that defines an entry names it.

use std::collections::HashMap;

use tracing::debug;

use crate::ApkArchive;
use crate::InspectError;
use crate::PackageHandle;
use crate::Result;
use crate::manifest::axml::Chunk;
use crate::manifest::axml::NO_ENTRY;
use crate::manifest::axml::StringPool;
use crate::manifest::axml::u16_at;
use crate::manifest::axml::u32_at;
use crate::registry::ResourceResolver;

/// Entry name of the compiled resource table.
pub const RESOURCES_ENTRY: &str = "resources.arsc";

const RES_TABLE_TYPE: u16 = 0x0002;
const RES_TABLE_PACKAGE_TYPE: u16 = 0x0200;
const RES_TABLE_TYPE_TYPE: u16 = 0x0201;

const FLAG_SPARSE: u8 = 0x01;
const FLAG_OFFSET16: u8 = 0x02;
const NO_ENTRY_16: u16 = 0xFFFF;

fn malformed(msg: &str) -> InspectError {
    InspectError::MalformedResources(msg.to_string())
}

/// Resource ID to `type/name` lookup table.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    names: HashMap<u32, String>,
}

impl ResourceTable {
    /// Parses a resource table.
    ///
    /// # Errors
    ///
    /// Returns `MalformedResources` if the table header is unreadable.
    /// Damaged packages or type chunks are skipped.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let root = Chunk::read(data, 0, data.len()).ok_or_else(|| malformed("bad table header"))?;
        if root.kind != RES_TABLE_TYPE {
            return Err(malformed("not a resource table"));
        }

        let mut table = Self::default();
        let mut offset = root.body();
        while let Some(chunk) = Chunk::read(data, offset, root.end) {
            if chunk.kind == RES_TABLE_PACKAGE_TYPE
                && table.read_package(data, chunk).is_none()
            {
                debug!(offset = chunk.start, "skipping damaged resource package");
            }
            offset = chunk.end;
        }
        Ok(table)
    }

    /// Loads the table of the base archive of `handle`.
    pub fn from_handle(handle: &PackageHandle) -> Result<Self> {
        let mut archive = ApkArchive::open(handle.base())?;
        Self::from_archive(&mut archive)
    }

    /// Loads the table of `archive`.
    pub fn from_archive(archive: &mut ApkArchive) -> Result<Self> {
        let data = archive.read(RESOURCES_ENTRY)?;
        Self::parse(&data)
    }

    fn read_package(&mut self, data: &[u8], package: Chunk) -> Option<()> {
        let package_id = u32_at(data, package.start + 8)?;
        let type_strings = u32_at(data, package.start + 268)? as usize;
        let key_strings = u32_at(data, package.start + 276)? as usize;
        let types = StringPool::parse(data, Chunk::read(data, package.start + type_strings, package.end)?)?;
        let keys = StringPool::parse(data, Chunk::read(data, package.start + key_strings, package.end)?)?;

        let mut offset = package.body();
        while let Some(chunk) = Chunk::read(data, offset, package.end) {
            if chunk.kind == RES_TABLE_TYPE_TYPE
                && self.read_type(data, chunk, package_id, &types, &keys).is_none()
            {
                debug!(offset = chunk.start, "skipping damaged type chunk");
            }
            offset = chunk.end;
        }
        Some(())
    }

    fn read_type(
        &mut self,
        data: &[u8],
        chunk: Chunk,
        package_id: u32,
        types: &StringPool,
        keys: &StringPool,
    ) -> Option<()> {
        let type_id = *data.get(chunk.start + 8)?;
        let flags = *data.get(chunk.start + 9)?;
        let entry_count = u32_at(data, chunk.start + 12)? as usize;
        let entries_start = chunk.start + u32_at(data, chunk.start + 16)? as usize;
        let type_name = types.get(u32::from(type_id).checked_sub(1)?)?;
        let offsets = chunk.body();

        for i in 0..entry_count {
            let (index, offset) = if flags & FLAG_SPARSE != 0 {
                let at = offsets + i * 4;
                (
                    usize::from(u16_at(data, at)?),
                    usize::from(u16_at(data, at + 2)?) * 4,
                )
            } else if flags & FLAG_OFFSET16 != 0 {
                let raw = u16_at(data, offsets + i * 2)?;
                if raw == NO_ENTRY_16 {
                    continue;
                }
                (i, usize::from(raw) * 4)
            } else {
                let raw = u32_at(data, offsets + i * 4)?;
                if raw == NO_ENTRY {
                    continue;
                }
                (i, raw as usize)
            };

            let entry = entries_start + offset;
            if entry + 8 > chunk.end {
                return None;
            }
            let Some(key) = u32_at(data, entry + 4).and_then(|k| keys.get(k)) else {
                continue;
            };
            let id = (package_id << 24) | (u32::from(type_id) << 16) | (index as u32 & 0xFFFF);
            self.names
                .entry(id)
                .or_insert_with(|| format!("{type_name}/{key}"));
        }
        Some(())
    }

    /// Number of named resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no resource was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl ResourceResolver for ResourceTable {
    fn resource_name(&self, id: u32) -> Option<String> {
        self.names.get(&id).cloned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_arsc;
    use crate::test_utils::write_test_zip;
    use tempfile::TempDir;

    #[test]
    fn test_resolves_names() {
        let data = create_test_arsc(&[
            ("string", "app_name"),
            ("string", "title"),
            ("drawable", "icon"),
        ]);
        let table = ResourceTable::parse(&data).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.resource_name(0x7F01_0000).unwrap(), "string/app_name");
        assert_eq!(table.resource_name(0x7F01_0001).unwrap(), "string/title");
        assert_eq!(table.resource_name(0x7F02_0000).unwrap(), "drawable/icon");
        assert_eq!(table.resource_name(0x7F02_0001), None);
    }

    #[test]
    fn test_rejects_non_table() {
        assert!(matches!(
            ResourceTable::parse(b"\x03\x00\x08\x00\x08\x00\x00\x00"),
            Err(InspectError::MalformedResources(_))
        ));
        assert!(ResourceTable::parse(&[]).is_err());
    }

    #[test]
    fn test_truncated_table_keeps_nothing_broken() {
        let data = create_test_arsc(&[("string", "app_name")]);
        let mut truncated = data[..data.len() - 8].to_vec();
        // Keep the root header consistent with the shorter buffer.
        let len = truncated.len() as u32;
        truncated[4..8].copy_from_slice(&len.to_le_bytes());
        let table = ResourceTable::parse(&truncated).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("base.apk");
        write_test_zip(&path, &[(RESOURCES_ENTRY, &create_test_arsc(&[("xml", "prefs")]))]);

        let table = ResourceTable::from_handle(&PackageHandle::standalone(path)).unwrap();
        assert_eq!(table.resource_name(0x7F01_0000).unwrap(), "xml/prefs");
    }

    #[test]
    fn test_missing_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("base.apk");
        write_test_zip(&path, &[("classes.dex", b"")]);

        let result = ResourceTable::from_handle(&PackageHandle::standalone(path));
        assert!(matches!(result, Err(InspectError::MissingEntry { .. })));
    }
}

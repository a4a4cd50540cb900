//! Streaming reader for Android binary XML.
//!
//! Only the chunks needed to walk start elements are decoded: the string
//! pool, the attribute resource map and start/end element chunks. Namespace
//! and CDATA chunks are skipped.

use crate::InspectError;
use crate::Result;
use crate::manifest::ManifestValue;

pub(crate) const RES_XML_TYPE: u16 = 0x0003;
pub(crate) const RES_STRING_POOL_TYPE: u16 = 0x0001;
pub(crate) const RES_XML_RESOURCE_MAP_TYPE: u16 = 0x0180;
pub(crate) const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;
pub(crate) const RES_XML_END_ELEMENT_TYPE: u16 = 0x0103;

pub(crate) const NO_ENTRY: u32 = 0xFFFF_FFFF;
const UTF8_FLAG: u32 = 0x0000_0100;

pub(crate) const TYPE_REFERENCE: u8 = 0x01;
pub(crate) const TYPE_STRING: u8 = 0x03;
pub(crate) const TYPE_FLOAT: u8 = 0x04;
pub(crate) const TYPE_INT_DEC: u8 = 0x10;
pub(crate) const TYPE_INT_HEX: u8 = 0x11;
pub(crate) const TYPE_INT_BOOLEAN: u8 = 0x12;

/// Framework attribute IDs used when a name was stripped from the pool.
const KNOWN_ATTRIBUTES: &[(u32, &str)] = &[
    (0x0101_0003, "name"),
    (0x0101_000e, "enabled"),
    (0x0101_0010, "exported"),
    (0x0101_0024, "value"),
    (0x0101_0025, "resource"),
    (0x0101_020c, "minSdkVersion"),
    (0x0101_021b, "versionCode"),
    (0x0101_021c, "versionName"),
    (0x0101_0270, "targetSdkVersion"),
];

fn malformed(msg: &str) -> InspectError {
    InspectError::MalformedManifest(msg.to_string())
}

pub(crate) fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Generic `ResChunk_header`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Chunk {
    pub(crate) kind: u16,
    pub(crate) header_size: usize,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl Chunk {
    /// Reads the chunk header at `start`, checking it fits in `limit`.
    pub(crate) fn read(data: &[u8], start: usize, limit: usize) -> Option<Self> {
        let kind = u16_at(data, start)?;
        let header_size = usize::from(u16_at(data, start + 2)?);
        let size = u32_at(data, start + 4)? as usize;
        let end = start.checked_add(size)?;
        if size < 8 || header_size < 8 || header_size > size || end > limit.min(data.len()) {
            return None;
        }
        Some(Self {
            kind,
            header_size,
            start,
            end,
        })
    }

    pub(crate) fn body(&self) -> usize {
        self.start + self.header_size
    }
}

/// Decoded `ResStringPool`.
#[derive(Debug, Default)]
pub(crate) struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    pub(crate) fn parse(data: &[u8], chunk: Chunk) -> Option<Self> {
        let count = u32_at(data, chunk.start + 8)? as usize;
        let flags = u32_at(data, chunk.start + 16)?;
        let strings_start = u32_at(data, chunk.start + 20)? as usize;
        let utf8 = flags & UTF8_FLAG != 0;

        let offsets_base = chunk.body();
        let strings_base = chunk.start.checked_add(strings_start)?;
        // Every offset needs four bytes; a count beyond that is corrupt.
        if count > (chunk.end - offsets_base) / 4 {
            return None;
        }

        let mut strings = Vec::with_capacity(count);
        for i in 0..count {
            let offset = u32_at(data, offsets_base + i * 4)? as usize;
            let at = strings_base.checked_add(offset)?;
            let text = if utf8 {
                read_utf8(data, at, chunk.end)
            } else {
                read_utf16(data, at, chunk.end)
            };
            strings.push(text.unwrap_or_default());
        }
        Some(Self { strings })
    }

    pub(crate) fn get(&self, index: u32) -> Option<&str> {
        if index == NO_ENTRY {
            return None;
        }
        self.strings.get(index as usize).map(String::as_str)
    }
}

fn read_utf8(data: &[u8], at: usize, limit: usize) -> Option<String> {
    let (_, skip) = utf8_length(data, at)?;
    let (len, skip2) = utf8_length(data, at + skip)?;
    let start = at + skip + skip2;
    let end = start.checked_add(len)?;
    if end > limit {
        return None;
    }
    Some(String::from_utf8_lossy(data.get(start..end)?).into_owned())
}

fn utf8_length(data: &[u8], at: usize) -> Option<(usize, usize)> {
    let first = *data.get(at)?;
    if first & 0x80 == 0 {
        Some((usize::from(first), 1))
    } else {
        let second = *data.get(at + 1)?;
        Some(((usize::from(first & 0x7F) << 8) | usize::from(second), 2))
    }
}

fn read_utf16(data: &[u8], at: usize, limit: usize) -> Option<String> {
    let first = u16_at(data, at)?;
    let (len, skip) = if first & 0x8000 == 0 {
        (usize::from(first), 2)
    } else {
        let second = u16_at(data, at + 2)?;
        ((usize::from(first & 0x7FFF) << 16) | usize::from(second), 4)
    };
    let start = at + skip;
    let end = start.checked_add(len.checked_mul(2)?)?;
    if end > limit {
        return None;
    }
    let units: Vec<u16> = data
        .get(start..end)?
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Some(String::from_utf16_lossy(&units))
}

/// One decoded attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Local attribute name, without namespace prefix.
    pub name: String,
    /// Typed value.
    pub value: ManifestValue,
}

/// One start element with its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element tag name.
    pub name: String,
    /// Nesting depth; the root element is at depth 0.
    pub depth: usize,
    /// Attributes in document order.
    pub attributes: Vec<Attribute>,
}

impl Element {
    /// Looks up an attribute by local name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&ManifestValue> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    /// Looks up a string attribute by local name.
    #[must_use]
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(ManifestValue::as_str)
    }
}

/// Walks every start element of a binary XML document in order.
///
/// The visitor returns `false` to stop the walk early.
///
/// # Errors
///
/// Returns `MalformedManifest` if the document header or string pool is
/// unreadable. Damage after the first start element ends the walk
/// silently, keeping whatever was visited.
pub fn walk_elements<F>(data: &[u8], mut visit: F) -> Result<()>
where
    F: FnMut(&Element) -> bool,
{
    let kind = u16_at(data, 0).ok_or_else(|| malformed("bad document header"))?;
    let header_size = u16_at(data, 2).ok_or_else(|| malformed("bad document header"))?;
    let declared = u32_at(data, 4).ok_or_else(|| malformed("bad document header"))?;
    if kind != RES_XML_TYPE || header_size < 8 {
        return Err(malformed("not a binary XML document"));
    }
    // A short read keeps every chunk that still fits.
    let root_end = (declared as usize).min(data.len());

    let mut pool: Option<StringPool> = None;
    let mut resource_ids: Vec<u32> = Vec::new();
    let mut depth = 0usize;
    let mut offset = usize::from(header_size);

    while offset < root_end {
        let Some(chunk) = Chunk::read(data, offset, root_end) else {
            if pool.is_none() {
                return Err(malformed("truncated chunk before string pool"));
            }
            break;
        };

        match chunk.kind {
            RES_STRING_POOL_TYPE if pool.is_none() => {
                pool = Some(
                    StringPool::parse(data, chunk).ok_or_else(|| malformed("bad string pool"))?,
                );
            }
            RES_XML_RESOURCE_MAP_TYPE => {
                resource_ids = (chunk.body()..chunk.end)
                    .step_by(4)
                    .map_while(|at| u32_at(data, at))
                    .collect();
            }
            RES_XML_START_ELEMENT_TYPE => {
                let strings = pool.as_ref().ok_or_else(|| malformed("element before string pool"))?;
                let Some(element) = read_element(data, chunk, strings, &resource_ids, depth) else {
                    break;
                };
                depth += 1;
                if !visit(&element) {
                    return Ok(());
                }
            }
            RES_XML_END_ELEMENT_TYPE => depth = depth.saturating_sub(1),
            _ => {}
        }
        offset = chunk.end;
    }

    if pool.is_none() {
        return Err(malformed("missing string pool"));
    }
    Ok(())
}

fn read_element(
    data: &[u8],
    chunk: Chunk,
    strings: &StringPool,
    resource_ids: &[u32],
    depth: usize,
) -> Option<Element> {
    let ext = chunk.body();
    let name = strings.get(u32_at(data, ext + 4)?)?.to_string();
    let attribute_start = usize::from(u16_at(data, ext + 8)?);
    let attribute_size = usize::from(u16_at(data, ext + 10)?);
    let attribute_count = usize::from(u16_at(data, ext + 12)?);
    if attribute_size < 20 {
        return None;
    }

    let mut attributes = Vec::with_capacity(attribute_count);
    for i in 0..attribute_count {
        let at = ext + attribute_start + i * attribute_size;
        if at + 20 > chunk.end {
            return None;
        }
        let name_index = u32_at(data, at + 4)?;
        let raw_value = u32_at(data, at + 8)?;
        let data_type = *data.get(at + 15)?;
        let value_data = u32_at(data, at + 16)?;

        let Some(attr_name) = attribute_name(strings, resource_ids, name_index) else {
            continue;
        };
        attributes.push(Attribute {
            name: attr_name,
            value: decode_value(strings, raw_value, data_type, value_data),
        });
    }

    Some(Element {
        name,
        depth,
        attributes,
    })
}

fn attribute_name(strings: &StringPool, resource_ids: &[u32], index: u32) -> Option<String> {
    match strings.get(index) {
        Some(name) if !name.is_empty() => Some(name.to_string()),
        _ => {
            let id = resource_ids.get(index as usize)?;
            KNOWN_ATTRIBUTES
                .iter()
                .find(|(known, _)| known == id)
                .map(|(_, name)| (*name).to_string())
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
fn decode_value(strings: &StringPool, raw_value: u32, data_type: u8, data: u32) -> ManifestValue {
    match data_type {
        TYPE_INT_BOOLEAN => ManifestValue::Bool(data != 0),
        TYPE_INT_DEC => ManifestValue::Int(i64::from(data as i32)),
        TYPE_INT_HEX | TYPE_REFERENCE => ManifestValue::Int(i64::from(data)),
        TYPE_FLOAT => ManifestValue::Str(f32::from_bits(data).to_string()),
        TYPE_STRING => strings
            .get(raw_value)
            .or_else(|| strings.get(data))
            .map_or_else(|| ManifestValue::Str(String::new()), |s| ManifestValue::Str(s.to_string())),
        _ => match strings.get(raw_value) {
            Some(raw) => ManifestValue::Str(raw.to_string()),
            None => ManifestValue::Int(i64::from(data)),
        },
    }
}

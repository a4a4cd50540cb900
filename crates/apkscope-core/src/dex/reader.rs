//! DEX container parsing, limited to the class table.

use crate::InspectError;
use crate::Result;

const HEADER_SIZE: usize = 0x70;
const STRING_IDS_SIZE: usize = 0x38;
const TYPE_IDS_SIZE: usize = 0x40;
const CLASS_DEFS_SIZE: usize = 0x60;
const CLASS_DEF_ITEM: usize = 32;

fn malformed(msg: impl Into<String>) -> InspectError {
    InspectError::MalformedDex(msg.into())
}

fn u32_at(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| malformed(format!("read past end at {offset:#x}")))
}

/// Bounds-checked `(count, offset)` table header.
fn table(data: &[u8], at: usize, item: usize) -> Result<(usize, usize)> {
    let count = u32_at(data, at)? as usize;
    let offset = u32_at(data, at + 4)? as usize;
    let end = count
        .checked_mul(item)
        .and_then(|len| len.checked_add(offset))
        .ok_or_else(|| malformed("table size overflow"))?;
    if count > 0 && end > data.len() {
        return Err(malformed(format!("table at {offset:#x} runs past end")));
    }
    Ok((count, offset))
}

/// Returns `true` if `data` starts with a DEX magic.
#[must_use]
pub fn is_dex(data: &[u8]) -> bool {
    data.len() >= 8 && &data[..4] == b"dex\n" && data[7] == 0
}

/// Lists the dotted names of every class defined in a DEX container.
///
/// Classes whose descriptor cannot be decoded are skipped.
///
/// # Errors
///
/// Returns `MalformedDex` if the header or the id tables are unreadable.
pub fn class_names(data: &[u8]) -> Result<Vec<String>> {
    if !is_dex(data) {
        return Err(malformed("bad magic"));
    }
    if data.len() < HEADER_SIZE {
        return Err(malformed("truncated header"));
    }

    let (string_count, string_ids) = table(data, STRING_IDS_SIZE, 4)?;
    let (type_count, type_ids) = table(data, TYPE_IDS_SIZE, 4)?;
    let (class_count, class_defs) = table(data, CLASS_DEFS_SIZE, CLASS_DEF_ITEM)?;

    let mut names = Vec::with_capacity(class_count);
    for i in 0..class_count {
        let type_idx = u32_at(data, class_defs + i * CLASS_DEF_ITEM)? as usize;
        if type_idx >= type_count {
            continue;
        }
        let string_idx = u32_at(data, type_ids + type_idx * 4)? as usize;
        if string_idx >= string_count {
            continue;
        }
        let string_off = u32_at(data, string_ids + string_idx * 4)? as usize;
        if let Some(name) = read_string(data, string_off).as_deref().and_then(descriptor_to_name) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Reads a `string_data_item`: a ULEB128 UTF-16 length followed by MUTF-8.
fn read_string(data: &[u8], offset: usize) -> Option<String> {
    let mut at = offset;
    let mut shift = 0;
    let mut utf16_len = 0usize;
    loop {
        let byte = *data.get(at)?;
        at += 1;
        utf16_len |= usize::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 28 {
            return None;
        }
    }

    // Every UTF-16 unit takes at least one byte.
    if utf16_len > data.len().saturating_sub(at) {
        return None;
    }

    let mut units = Vec::with_capacity(utf16_len);
    while units.len() < utf16_len {
        let a = *data.get(at)?;
        if a == 0 {
            return None;
        }
        if a & 0x80 == 0 {
            units.push(u16::from(a));
            at += 1;
        } else if a & 0xE0 == 0xC0 {
            let b = *data.get(at + 1)?;
            units.push((u16::from(a & 0x1F) << 6) | u16::from(b & 0x3F));
            at += 2;
        } else if a & 0xF0 == 0xE0 {
            let b = *data.get(at + 1)?;
            let c = *data.get(at + 2)?;
            units.push((u16::from(a & 0x0F) << 12) | (u16::from(b & 0x3F) << 6) | u16::from(c & 0x3F));
            at += 3;
        } else {
            return None;
        }
    }
    Some(String::from_utf16_lossy(&units))
}

/// Converts `Lcom/example/Foo;` to `com.example.Foo`.
///
/// Returns `None` for primitive and array descriptors.
#[must_use]
pub fn descriptor_to_name(descriptor: &str) -> Option<String> {
    let inner = descriptor.strip_prefix('L')?.strip_suffix(';')?;
    if inner.is_empty() {
        return None;
    }
    Some(inner.replace('/', "."))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_dex;

    #[test]
    fn test_class_names() {
        let dex = create_test_dex(&["com.example.MainActivity", "okhttp3.OkHttpClient"]);
        let names = class_names(&dex).unwrap();
        assert_eq!(names, vec!["com.example.MainActivity", "okhttp3.OkHttpClient"]);
    }

    #[test]
    fn test_empty_dex() {
        let dex = create_test_dex(&[]);
        assert!(class_names(&dex).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let result = class_names(b"PK\x03\x04not a dex at all");
        assert!(matches!(result, Err(InspectError::MalformedDex(_))));
    }

    #[test]
    fn test_rejects_out_of_range_table() {
        let mut dex = create_test_dex(&["a.B"]);
        dex[0x60..0x64].copy_from_slice(&0x0FFF_FFFFu32.to_le_bytes());
        assert!(class_names(&dex).is_err());
    }

    #[test]
    fn test_mutf8_two_byte_sequences() {
        // uleb128(3) 'a' U+00E9 (0xC3 0xA9) 'b' NUL
        let data = [3, b'a', 0xC3, 0xA9, b'b', 0];
        assert_eq!(read_string(&data, 0).unwrap(), "a\u{e9}b");
    }

    #[test]
    fn test_string_length_past_end() {
        // uleb128 length near 2^35 followed by one byte of payload
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x7F, b'a', 0];
        assert_eq!(read_string(&data, 0), None);
        assert_eq!(read_string(&[5, b'a', b'b', 0], 0), None);
    }

    #[test]
    fn test_oversized_string_length_skips_class() {
        let mut dex = create_test_dex(&["a.B"]);
        let string_ids = u32_at(&dex, STRING_IDS_SIZE + 4).unwrap() as usize;
        let string_off = u32_at(&dex, string_ids).unwrap() as usize;
        dex[string_off] = 0xFF;
        let names = class_names(&dex).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_oversized_class_table() {
        let mut dex = create_test_dex(&["a.B"]);
        dex[CLASS_DEFS_SIZE..CLASS_DEFS_SIZE + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(class_names(&dex), Err(InspectError::MalformedDex(_))));
    }

    #[test]
    fn test_descriptor_to_name() {
        assert_eq!(descriptor_to_name("Lkotlin/Unit;").unwrap(), "kotlin.Unit");
        assert_eq!(descriptor_to_name("[Ljava/lang/String;"), None);
        assert_eq!(descriptor_to_name("I"), None);
    }
}

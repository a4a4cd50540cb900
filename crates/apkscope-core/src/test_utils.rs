//! Test utilities for building APK fixtures.
//!
//! This module provides helpers that produce in-memory ZIP containers,
//! binary manifests, DEX files and resource tables, so tests never need
//! checked-in binary fixtures.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::io::Cursor;
use std::io::Write;
use std::path::Path;

use crate::manifest::axml::NO_ENTRY;
use crate::manifest::axml::RES_STRING_POOL_TYPE;
use crate::manifest::axml::RES_XML_END_ELEMENT_TYPE;
use crate::manifest::axml::RES_XML_RESOURCE_MAP_TYPE;
use crate::manifest::axml::RES_XML_START_ELEMENT_TYPE;
use crate::manifest::axml::RES_XML_TYPE;
use crate::manifest::axml::TYPE_INT_BOOLEAN;
use crate::manifest::axml::TYPE_INT_DEC;
use crate::manifest::axml::TYPE_REFERENCE;
use crate::manifest::axml::TYPE_STRING;

/// Creates an in-memory ZIP archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Names ending in `/` become
/// directory entries.
///
/// # Examples
///
/// ```
/// use apkscope_core::test_utils::create_test_zip;
///
/// let zip_data = create_test_zip(&[("lib/arm64-v8a/libfoo.so", b"\x7fELF")]);
/// ```
#[must_use]
pub fn create_test_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use zip::write::SimpleFileOptions;
    use zip::write::ZipWriter;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for (path, data) in entries {
        if let Some(dir) = path.strip_suffix('/') {
            zip.add_directory(dir, options).unwrap();
        } else {
            zip.start_file(*path, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }

    zip.finish().unwrap().into_inner()
}

/// Writes [`create_test_zip`] output to `path`.
pub fn write_test_zip(path: &Path, entries: &[(&str, &[u8])]) {
    std::fs::write(path, create_test_zip(entries)).unwrap();
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn set_u32(out: &mut [u8], at: usize, value: u32) {
    out[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Encodes a UTF-16 `ResStringPool` chunk.
fn string_pool_chunk(strings: &[String]) -> Vec<u8> {
    let header_size = 28u32;
    let count = strings.len() as u32;
    let mut data = Vec::new();
    let mut offsets = Vec::with_capacity(strings.len());
    for s in strings {
        offsets.push(data.len() as u32);
        let units: Vec<u16> = s.encode_utf16().collect();
        push_u16(&mut data, units.len() as u16);
        for unit in units {
            push_u16(&mut data, unit);
        }
        push_u16(&mut data, 0);
    }
    pad4(&mut data);

    let mut chunk = Vec::new();
    push_u16(&mut chunk, RES_STRING_POOL_TYPE);
    push_u16(&mut chunk, header_size as u16);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, count);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, header_size + count * 4);
    push_u32(&mut chunk, 0);
    for offset in offsets {
        push_u32(&mut chunk, offset);
    }
    chunk.extend_from_slice(&data);
    let size = chunk.len() as u32;
    set_u32(&mut chunk, 4, size);
    chunk
}

#[derive(Default)]
struct Interner {
    strings: Vec<String>,
    index: HashMap<String, u32>,
}

impl Interner {
    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        let i = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        i
    }

    fn push_raw(&mut self, s: &str) -> u32 {
        let i = self.strings.len() as u32;
        self.strings.push(s.to_string());
        i
    }
}

/// Attribute value for [`AxmlBuilder`].
#[derive(Debug, Clone, Copy)]
pub enum AttrValue<'a> {
    /// String value.
    Str(&'a str),
    /// Decimal integer value.
    Int(i32),
    /// Boolean value.
    Bool(bool),
    /// Resource reference.
    Reference(u32),
}

#[derive(Clone)]
enum OwnedValue {
    Str(String),
    Int(i32),
    Bool(bool),
    Reference(u32),
}

impl From<AttrValue<'_>> for OwnedValue {
    fn from(value: AttrValue<'_>) -> Self {
        match value {
            AttrValue::Str(s) => Self::Str(s.to_string()),
            AttrValue::Int(i) => Self::Int(i),
            AttrValue::Bool(b) => Self::Bool(b),
            AttrValue::Reference(r) => Self::Reference(r),
        }
    }
}

enum AttrName {
    Named(String),
    Id(u32),
}

enum Event {
    Start(String, Vec<(AttrName, OwnedValue)>),
    End(String),
}

/// Builder for binary XML documents such as `AndroidManifest.xml`.
///
/// # Examples
///
/// ```
/// use apkscope_core::test_utils::AttrValue;
/// use apkscope_core::test_utils::AxmlBuilder;
///
/// let manifest = AxmlBuilder::new()
///     .start("manifest", &[("package", AttrValue::Str("com.example"))])
///     .start("uses-sdk", &[("minSdkVersion", AttrValue::Int(24))])
///     .end()
///     .end()
///     .build();
/// ```
#[derive(Default)]
pub struct AxmlBuilder {
    events: Vec<Event>,
    open: Vec<String>,
}

impl AxmlBuilder {
    /// Creates an empty document builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an element with named attributes.
    #[must_use]
    pub fn start(mut self, name: &str, attrs: &[(&str, AttrValue<'_>)]) -> Self {
        let attrs = attrs
            .iter()
            .map(|(n, v)| (AttrName::Named((*n).to_string()), OwnedValue::from(*v)))
            .collect();
        self.events.push(Event::Start(name.to_string(), attrs));
        self.open.push(name.to_string());
        self
    }

    /// Opens an element whose attribute names are stripped from the string
    /// pool and only identified through the resource map.
    #[must_use]
    pub fn start_with_ids(mut self, name: &str, attrs: &[(u32, AttrValue<'_>)]) -> Self {
        let attrs = attrs
            .iter()
            .map(|(id, v)| (AttrName::Id(*id), OwnedValue::from(*v)))
            .collect();
        self.events.push(Event::Start(name.to_string(), attrs));
        self.open.push(name.to_string());
        self
    }

    /// Opens and immediately closes an element.
    #[must_use]
    pub fn leaf(self, name: &str, attrs: &[(&str, AttrValue<'_>)]) -> Self {
        self.start(name, attrs).end()
    }

    /// Closes the innermost open element.
    #[must_use]
    pub fn end(mut self) -> Self {
        let name = self.open.pop().unwrap();
        self.events.push(Event::End(name));
        self
    }

    /// Encodes the document.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut pool = Interner::default();

        // Resource-mapped names must occupy the first pool slots.
        let mut ids: Vec<u32> = Vec::new();
        for event in &self.events {
            if let Event::Start(_, attrs) = event {
                for (name, _) in attrs {
                    if let AttrName::Id(id) = name
                        && !ids.contains(id)
                    {
                        ids.push(*id);
                    }
                }
            }
        }
        for _ in &ids {
            pool.push_raw("");
        }

        let mut body = Vec::new();
        for event in &self.events {
            match event {
                Event::Start(name, attrs) => {
                    let name_idx = pool.intern(name);
                    let mut chunk = Vec::new();
                    push_u16(&mut chunk, RES_XML_START_ELEMENT_TYPE);
                    push_u16(&mut chunk, 16);
                    push_u32(&mut chunk, 0);
                    push_u32(&mut chunk, 1);
                    push_u32(&mut chunk, NO_ENTRY);
                    push_u32(&mut chunk, NO_ENTRY);
                    push_u32(&mut chunk, name_idx);
                    push_u16(&mut chunk, 20);
                    push_u16(&mut chunk, 20);
                    push_u16(&mut chunk, attrs.len() as u16);
                    push_u16(&mut chunk, 0);
                    push_u16(&mut chunk, 0);
                    push_u16(&mut chunk, 0);
                    for (attr_name, value) in attrs {
                        let attr_idx = match attr_name {
                            AttrName::Named(n) => pool.intern(n),
                            AttrName::Id(id) => {
                                ids.iter().position(|known| known == id).unwrap() as u32
                            }
                        };
                        let (raw, data_type, data) = match value {
                            OwnedValue::Str(s) => {
                                let i = pool.intern(s);
                                (i, TYPE_STRING, i)
                            }
                            #[allow(clippy::cast_sign_loss)]
                            OwnedValue::Int(i) => (NO_ENTRY, TYPE_INT_DEC, *i as u32),
                            OwnedValue::Bool(b) => {
                                (NO_ENTRY, TYPE_INT_BOOLEAN, if *b { NO_ENTRY } else { 0 })
                            }
                            OwnedValue::Reference(r) => (NO_ENTRY, TYPE_REFERENCE, *r),
                        };
                        push_u32(&mut chunk, NO_ENTRY);
                        push_u32(&mut chunk, attr_idx);
                        push_u32(&mut chunk, raw);
                        push_u16(&mut chunk, 8);
                        chunk.push(0);
                        chunk.push(data_type);
                        push_u32(&mut chunk, data);
                    }
                    let size = chunk.len() as u32;
                    set_u32(&mut chunk, 4, size);
                    body.extend_from_slice(&chunk);
                }
                Event::End(name) => {
                    let name_idx = pool.intern(name);
                    push_u16(&mut body, RES_XML_END_ELEMENT_TYPE);
                    push_u16(&mut body, 16);
                    push_u32(&mut body, 24);
                    push_u32(&mut body, 1);
                    push_u32(&mut body, NO_ENTRY);
                    push_u32(&mut body, NO_ENTRY);
                    push_u32(&mut body, name_idx);
                }
            }
        }

        let mut doc = Vec::new();
        push_u16(&mut doc, RES_XML_TYPE);
        push_u16(&mut doc, 8);
        push_u32(&mut doc, 0);
        doc.extend_from_slice(&string_pool_chunk(&pool.strings));
        if !ids.is_empty() {
            push_u16(&mut doc, RES_XML_RESOURCE_MAP_TYPE);
            push_u16(&mut doc, 8);
            push_u32(&mut doc, 8 + 4 * ids.len() as u32);
            for id in &ids {
                push_u32(&mut doc, *id);
            }
        }
        doc.extend_from_slice(&body);
        let size = doc.len() as u32;
        set_u32(&mut doc, 4, size);
        doc
    }
}

fn push_uleb128(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

/// Builds a minimal DEX file defining the given classes.
///
/// Class names are dotted (`com.example.Foo`). Only the sections the class
/// scanner reads are populated.
///
/// # Examples
///
/// ```
/// use apkscope_core::test_utils::create_test_dex;
///
/// let dex = create_test_dex(&["com.example.Foo", "okhttp3.OkHttpClient"]);
/// assert_eq!(&dex[..4], b"dex\n");
/// ```
#[must_use]
pub fn create_test_dex(classes: &[&str]) -> Vec<u8> {
    const HEADER_SIZE: u32 = 0x70;
    let n = classes.len() as u32;
    let string_ids_off = HEADER_SIZE;
    let type_ids_off = string_ids_off + 4 * n;
    let class_defs_off = type_ids_off + 4 * n;
    let data_off = class_defs_off + 32 * n;

    let mut string_data = Vec::new();
    let mut string_offsets = Vec::with_capacity(classes.len());
    for class in classes {
        string_offsets.push(data_off + string_data.len() as u32);
        let descriptor = format!("L{};", class.replace('.', "/"));
        push_uleb128(&mut string_data, descriptor.encode_utf16().count() as u32);
        string_data.extend_from_slice(descriptor.as_bytes());
        string_data.push(0);
    }

    let mut dex = Vec::new();
    dex.extend_from_slice(b"dex\n035\0");
    dex.resize(HEADER_SIZE as usize, 0);
    set_u32(&mut dex, 0x24, HEADER_SIZE);
    set_u32(&mut dex, 0x28, 0x1234_5678);
    set_u32(&mut dex, 0x38, n);
    set_u32(&mut dex, 0x3C, string_ids_off);
    set_u32(&mut dex, 0x40, n);
    set_u32(&mut dex, 0x44, type_ids_off);
    set_u32(&mut dex, 0x60, n);
    set_u32(&mut dex, 0x64, class_defs_off);
    set_u32(&mut dex, 0x68, string_data.len() as u32);
    set_u32(&mut dex, 0x6C, data_off);

    for offset in &string_offsets {
        push_u32(&mut dex, *offset);
    }
    for i in 0..n {
        push_u32(&mut dex, i);
    }
    for i in 0..n {
        push_u32(&mut dex, i);
        push_u32(&mut dex, 0x0001);
        push_u32(&mut dex, NO_ENTRY);
        push_u32(&mut dex, 0);
        push_u32(&mut dex, NO_ENTRY);
        push_u32(&mut dex, 0);
        push_u32(&mut dex, 0);
        push_u32(&mut dex, 0);
    }
    dex.extend_from_slice(&string_data);
    let size = dex.len() as u32;
    set_u32(&mut dex, 0x20, size);
    dex
}

/// Builds a single-package `resources.arsc` with one default configuration.
///
/// Each resource is `(type name, entry name)`; types are numbered from 1 in
/// order of first appearance and entries from 0 within each type, so
/// `[("string", "app_name")]` yields ID `0x7F010000`.
#[must_use]
pub fn create_test_arsc(resources: &[(&str, &str)]) -> Vec<u8> {
    const CONFIG_SIZE: u32 = 64;

    let mut type_names: Vec<String> = Vec::new();
    let mut key_names: Vec<String> = Vec::new();
    let mut by_type: Vec<Vec<u32>> = Vec::new();
    for (type_name, entry) in resources {
        let type_idx = type_names
            .iter()
            .position(|t| t == type_name)
            .unwrap_or_else(|| {
                type_names.push((*type_name).to_string());
                by_type.push(Vec::new());
                type_names.len() - 1
            });
        by_type[type_idx].push(key_names.len() as u32);
        key_names.push((*entry).to_string());
    }

    let type_pool = string_pool_chunk(&type_names);
    let key_pool = string_pool_chunk(&key_names);

    let mut package = Vec::new();
    push_u16(&mut package, 0x0200);
    push_u16(&mut package, 288);
    push_u32(&mut package, 0);
    push_u32(&mut package, 0x7F);
    let mut name = [0u8; 256];
    for (i, unit) in "com.example".encode_utf16().enumerate() {
        name[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    package.extend_from_slice(&name);
    push_u32(&mut package, 288);
    push_u32(&mut package, type_names.len() as u32);
    push_u32(&mut package, 288 + type_pool.len() as u32);
    push_u32(&mut package, key_names.len() as u32);
    push_u32(&mut package, 0);
    package.extend_from_slice(&type_pool);
    package.extend_from_slice(&key_pool);

    for (type_idx, keys) in by_type.iter().enumerate() {
        let header_size = 20 + CONFIG_SIZE;
        let entries_start = header_size + 4 * keys.len() as u32;
        let mut chunk = Vec::new();
        push_u16(&mut chunk, 0x0201);
        push_u16(&mut chunk, header_size as u16);
        push_u32(&mut chunk, 0);
        chunk.push(type_idx as u8 + 1);
        chunk.push(0);
        push_u16(&mut chunk, 0);
        push_u32(&mut chunk, keys.len() as u32);
        push_u32(&mut chunk, entries_start);
        push_u32(&mut chunk, CONFIG_SIZE);
        chunk.resize(header_size as usize, 0);
        for i in 0..keys.len() as u32 {
            push_u32(&mut chunk, i * 16);
        }
        for key in keys {
            push_u16(&mut chunk, 8);
            push_u16(&mut chunk, 0);
            push_u32(&mut chunk, *key);
            push_u16(&mut chunk, 8);
            chunk.push(0);
            chunk.push(TYPE_INT_DEC);
            push_u32(&mut chunk, 0);
        }
        let size = chunk.len() as u32;
        set_u32(&mut chunk, 4, size);
        package.extend_from_slice(&chunk);
    }
    let size = package.len() as u32;
    set_u32(&mut package, 4, size);

    let mut table = Vec::new();
    push_u16(&mut table, 0x0002);
    push_u16(&mut table, 12);
    push_u32(&mut table, 0);
    push_u32(&mut table, 1);
    table.extend_from_slice(&string_pool_chunk(&[]));
    table.extend_from_slice(&package);
    let size = table.len() as u32;
    set_u32(&mut table, 4, size);
    table
}

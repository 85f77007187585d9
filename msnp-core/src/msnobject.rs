// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! MSNObject
//!
//! Content-addressed descriptors for binary blobs (display pictures,
//! emoticons) and the catalog that caches them.
//!
//! An object is identified by two checksums: `SHA1D` over the data and
//! `SHA1C` over the descriptor fields. The catalog is keyed by `SHA1C`.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use parking_lot::RwLock;
use ring::digest;

use crate::error::ParseError;
use crate::protocol::percent_decode;

/// Kind of blob an MSNObject describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsnObjectType {
    Avatar,
    Emoticon,
    UserDisplay,
    SharedFile,
    Background,
    Wink,
    VoiceClip,
}

impl MsnObjectType {
    pub fn code(self) -> u32 {
        match self {
            MsnObjectType::Avatar => 1,
            MsnObjectType::Emoticon => 2,
            MsnObjectType::UserDisplay => 3,
            MsnObjectType::SharedFile => 4,
            MsnObjectType::Background => 5,
            MsnObjectType::Wink => 8,
            MsnObjectType::VoiceClip => 11,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(MsnObjectType::Avatar),
            2 => Some(MsnObjectType::Emoticon),
            3 => Some(MsnObjectType::UserDisplay),
            4 => Some(MsnObjectType::SharedFile),
            5 => Some(MsnObjectType::Background),
            8 => Some(MsnObjectType::Wink),
            11 => Some(MsnObjectType::VoiceClip),
            _ => None,
        }
    }
}

/// Descriptor of a content-addressed blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsnObject {
    creator: String,
    size: u64,
    object_type: MsnObjectType,
    location: String,
    friendly: String,
    sha1d: String,
    sha1c: String,
}

impl MsnObject {
    /// Builds a descriptor for `data` created by `creator`.
    pub fn from_data(creator: &str, object_type: MsnObjectType, data: &[u8]) -> Self {
        let sha1d = sha1_base64(data);
        let friendly = encode_friendly("");
        let location = "0".to_string();
        let size = data.len() as u64;
        let sha1c = compute_sha1c(creator, size, object_type, &location, &friendly, &sha1d);

        MsnObject {
            creator: creator.to_string(),
            size,
            object_type,
            location,
            friendly,
            sha1d,
            sha1c,
        }
    }

    /// Parses a `<msnobj .../>` context string, percent-encoded or not.
    pub fn parse(context: &str) -> Result<Self, ParseError> {
        let decoded;
        let context = if context.trim_start().starts_with('%') {
            decoded = percent_decode(context);
            decoded.as_str()
        } else {
            context
        };

        let attrs = parse_attributes(context);
        let get = |name: &str| -> Result<String, ParseError> {
            attrs
                .get(name)
                .cloned()
                .ok_or_else(|| ParseError::UnknownValue {
                    kind: "msnobject attribute",
                    value: name.into(),
                })
        };

        let size = get("Size")?
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidPayloadLength(context.into()))?;
        let type_code = get("Type")?;
        let object_type = type_code
            .parse::<u32>()
            .ok()
            .and_then(MsnObjectType::from_code)
            .ok_or(ParseError::UnknownValue {
                kind: "msnobject type",
                value: type_code,
            })?;
        let sha1d = get("SHA1D")?;
        let creator = get("Creator")?;
        let location = attrs.get("Location").cloned().unwrap_or_else(|| "0".into());
        let friendly = attrs.get("Friendly").cloned().unwrap_or_else(|| encode_friendly(""));
        let sha1c = match attrs.get("SHA1C") {
            Some(sha1c) => sha1c.clone(),
            None => compute_sha1c(&creator, size, object_type, &location, &friendly, &sha1d),
        };

        Ok(MsnObject {
            creator,
            size,
            object_type,
            location,
            friendly,
            sha1d,
            sha1c,
        })
    }

    /// The `<msnobj .../>` context string.
    pub fn context(&self) -> String {
        format!(
            "<msnobj Creator=\"{}\" Size=\"{}\" Type=\"{}\" Location=\"{}\" Friendly=\"{}\" SHA1D=\"{}\" SHA1C=\"{}\"/>",
            self.creator,
            self.size,
            self.object_type.code(),
            self.location,
            self.friendly,
            self.sha1d,
            self.sha1c
        )
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn object_type(&self) -> MsnObjectType {
        self.object_type
    }

    pub fn sha1d(&self) -> &str {
        &self.sha1d
    }

    /// Catalog key.
    pub fn sha1c(&self) -> &str {
        &self.sha1c
    }

    /// True if `data` hashes to this descriptor's `SHA1D`.
    pub fn matches_data(&self, data: &[u8]) -> bool {
        data.len() as u64 == self.size && sha1_base64(data) == self.sha1d
    }
}

/// A display picture: descriptor plus bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayImage {
    object: MsnObject,
    data: Arc<Vec<u8>>,
}

impl DisplayImage {
    pub fn new(creator: &str, data: Vec<u8>) -> Self {
        let object = MsnObject::from_data(creator, MsnObjectType::UserDisplay, &data);
        DisplayImage {
            object,
            data: Arc::new(data),
        }
    }

    pub fn object(&self) -> &MsnObject {
        &self.object
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn sha1c(&self) -> &str {
        self.object.sha1c()
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    object: MsnObject,
    data: Option<Arc<Vec<u8>>>,
}

/// Content-addressed cache of MSNObjects.
///
/// Constructed explicitly and shared through `Arc` by the components that
/// need it; its lifetime is that of the session that created it.
#[derive(Debug, Default)]
pub struct MsnObjectCatalog {
    entries: RwLock<HashMap<String, CatalogEntry>>,
}

impl MsnObjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry. Returns the catalog key.
    pub fn add(&self, object: MsnObject, data: Option<Vec<u8>>) -> String {
        let key = object.sha1c().to_string();
        if let Some(bytes) = &data {
            if !object.matches_data(bytes) {
                tracing::warn!(sha1c = %key, "catalog data does not match SHA1D");
            }
        }
        self.entries.write().insert(
            key.clone(),
            CatalogEntry {
                object,
                data: data.map(Arc::new),
            },
        );
        key
    }

    /// Adds a display image.
    pub fn add_display_image(&self, image: &DisplayImage) -> String {
        let key = image.sha1c().to_string();
        self.entries.write().insert(
            key.clone(),
            CatalogEntry {
                object: image.object.clone(),
                data: Some(image.data.clone()),
            },
        );
        key
    }

    pub fn get(&self, sha1c: &str) -> Option<MsnObject> {
        self.entries.read().get(sha1c).map(|e| e.object.clone())
    }

    pub fn get_data(&self, sha1c: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.read().get(sha1c).and_then(|e| e.data.clone())
    }

    /// Looks up by context string. Unparsable contexts resolve to `None`.
    pub fn get_by_context(&self, context: &str) -> Option<MsnObject> {
        match MsnObject::parse(context) {
            Ok(object) => self.get(object.sha1c()),
            Err(err) => {
                tracing::error!(error = %err, "unparsable msnobject context");
                None
            }
        }
    }

    pub fn contains(&self, sha1c: &str) -> bool {
        self.entries.read().contains_key(sha1c)
    }

    pub fn remove(&self, sha1c: &str) -> bool {
        self.entries.write().remove(sha1c).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

fn sha1_base64(data: &[u8]) -> String {
    let hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, data);
    base64::engine::general_purpose::STANDARD.encode(hash.as_ref())
}

fn compute_sha1c(
    creator: &str,
    size: u64,
    object_type: MsnObjectType,
    location: &str,
    friendly: &str,
    sha1d: &str,
) -> String {
    let fields = format!(
        "Creator{}Size{}Type{}Location{}Friendly{}SHA1D{}",
        creator,
        size,
        object_type.code(),
        location,
        friendly,
        sha1d
    );
    sha1_base64(fields.as_bytes())
}

/// Base64 of the UTF-16LE name plus a terminating NUL.
fn encode_friendly(name: &str) -> String {
    let mut bytes: Vec<u8> = name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    bytes.extend_from_slice(&[0, 0]);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Scans `Name="value"` pairs.
pub(crate) fn parse_attributes(text: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let mut rest = text;
    while let Some(eq) = rest.find("=\"") {
        let name = rest[..eq]
            .rsplit(|c: char| c.is_whitespace() || c == '<')
            .next()
            .unwrap_or("")
            .to_string();
        let after = &rest[eq + 2..];
        let Some(end) = after.find('"') else {
            break;
        };
        if !name.is_empty() {
            attrs.insert(name, after[..end].to_string());
        }
        rest = &after[end + 1..];
    }
    attrs
}

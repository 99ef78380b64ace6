/// Localized message catalog, read from a compiled gettext `.mo` file.

use std::path::Path;
use thiserror::Error;

const MAGIC: u32 = 0x9504_12de;
const HEADER_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a gettext catalog (magic {0:#010x})")]
    BadMagic(u32),
    #[error("catalog truncated at offset {0}")]
    Truncated(usize),
    #[error("catalog entry {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

/// One `(id, text)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub text: String,
}

/// An ordered collection of localized strings, queried by exact id.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Copy)]
enum ByteOrder {
    Little,
    Big,
}

impl MessageCatalog {
    pub fn load_mo(path: &Path) -> Result<MessageCatalog, MessageError> {
        let bytes = std::fs::read(path)?;
        Self::from_mo_bytes(&bytes)
    }

    /// Decode a `.mo` file of either byte order.
    ///
    /// Only the first plural form of each message is kept, message contexts
    /// are stripped from ids, and the metadata entry (empty id) is skipped.
    pub fn from_mo_bytes(bytes: &[u8]) -> Result<MessageCatalog, MessageError> {
        if bytes.len() < HEADER_LEN {
            return Err(MessageError::Truncated(bytes.len()));
        }
        let order = match word(bytes, 0, ByteOrder::Little)? {
            MAGIC => ByteOrder::Little,
            other if other.swap_bytes() == MAGIC => ByteOrder::Big,
            other => return Err(MessageError::BadMagic(other)),
        };

        let count = word(bytes, 8, order)? as usize;
        let ids_at = word(bytes, 12, order)? as usize;
        let texts_at = word(bytes, 16, order)? as usize;
        for table_at in [ids_at, texts_at] {
            let end = count
                .checked_mul(8)
                .and_then(|len| len.checked_add(table_at))
                .ok_or(MessageError::Truncated(table_at))?;
            if end > bytes.len() {
                return Err(MessageError::Truncated(table_at));
            }
        }

        let mut entries = Vec::with_capacity(count);
        for index in 0..count {
            let id = string_at(bytes, ids_at + index * 8, order, index)?;
            let text = string_at(bytes, texts_at + index * 8, order, index)?;

            let id = first_form(id);
            let id = id.split_once('\u{4}').map_or(id, |(_, id)| id);
            if id.is_empty() {
                continue;
            }
            entries.push(CatalogEntry {
                id: id.to_string(),
                text: first_form(text).to_string(),
            });
        }

        Ok(MessageCatalog { entries })
    }

    /// Text of the first entry whose id equals `id`.
    pub fn find(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.text.as_str())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<I: Into<String>, T: Into<String>> FromIterator<(I, T)> for MessageCatalog {
    fn from_iter<It: IntoIterator<Item = (I, T)>>(iter: It) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(id, text)| CatalogEntry {
                    id: id.into(),
                    text: text.into(),
                })
                .collect(),
        }
    }
}

fn word(bytes: &[u8], offset: usize, order: ByteOrder) -> Result<u32, MessageError> {
    let raw: [u8; 4] = offset
        .checked_add(4)
        .and_then(|end| bytes.get(offset..end))
        .and_then(|b| b.try_into().ok())
        .ok_or(MessageError::Truncated(offset))?;
    Ok(match order {
        ByteOrder::Little => u32::from_le_bytes(raw),
        ByteOrder::Big => u32::from_be_bytes(raw),
    })
}

/// Resolve a `(length, offset)` descriptor into the string it points at.
fn string_at(
    bytes: &[u8],
    descriptor: usize,
    order: ByteOrder,
    index: usize,
) -> Result<&str, MessageError> {
    let len = word(bytes, descriptor, order)? as usize;
    let start = word(bytes, descriptor + 4, order)? as usize;
    let raw = start
        .checked_add(len)
        .and_then(|end| bytes.get(start..end))
        .ok_or(MessageError::Truncated(start))?;
    std::str::from_utf8(raw).map_err(|_| MessageError::InvalidUtf8(index))
}

fn first_form(s: &str) -> &str {
    s.split('\0').next().unwrap_or(s)
}

//! Tag-length-value fields.
//!
//! Rather than splicing substrings in place, payloads are parsed into an ordered list of [`TlvField`]s, edited, and
//! serialized again. Serialization reproduces the input exactly, so `parse(p).to_string() == p` for every well-formed
//! payload `p`.
use std::fmt::{self, Display};

use crate::qris::{tags, QrisError};

/// The largest value a two-digit length prefix can describe.
pub const MAX_VALUE_LEN: usize = 99;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvField {
    tag: String,
    value: String,
}

impl TlvField {
    pub fn new<S: Into<String>>(tag: &str, value: S) -> Result<Self, QrisError> {
        check_tag(tag)?;
        let value = value.into();
        let len = value.chars().count();
        if len > MAX_VALUE_LEN {
            return Err(QrisError::FieldTooLong { tag: tag.to_string(), len });
        }
        Ok(Self { tag: tag.to_string(), value })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Display for TlvField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}{}", self.tag, self.value.chars().count(), self.value)
    }
}

/// An ordered list of TLV fields. The same type is used for top-level payloads and for the nested templates carried
/// inside composite fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvPayload {
    fields: Vec<TlvField>,
}

impl TlvPayload {
    /// Strictly parses `payload`. Every character must belong to a complete field.
    pub fn parse(payload: &str) -> Result<Self, QrisError> {
        let fields = FieldScanner::new(payload)
            .map(|r| r.map(|(tag, value)| TlvField { tag: tag.to_string(), value: value.to_string() }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[TlvField] {
        &self.fields
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.tag == tag).map(TlvField::value)
    }

    /// Sets `tag` to `value`. An existing field keeps its position. A new field goes immediately before the CRC
    /// field, or at the end if there is no CRC field yet.
    pub fn set<S: Into<String>>(&mut self, tag: &str, value: S) -> Result<(), QrisError> {
        let field = TlvField::new(tag, value)?;
        if let Some(existing) = self.fields.iter_mut().find(|f| f.tag == tag) {
            *existing = field;
            return Ok(());
        }
        let at = self.fields.iter().position(|f| f.tag == tags::CRC).unwrap_or(self.fields.len());
        self.fields.insert(at, field);
        Ok(())
    }

    pub fn remove(&mut self, tag: &str) -> Option<TlvField> {
        let at = self.fields.iter().position(|f| f.tag == tag)?;
        Some(self.fields.remove(at))
    }

    /// Parses the value of the composite field `outer` as a nested payload.
    pub fn nested(&self, outer: &str) -> Result<Option<TlvPayload>, QrisError> {
        self.get(outer).map(TlvPayload::parse).transpose()
    }
}

impl Display for TlvPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fields.iter().try_for_each(|field| write!(f, "{field}"))
    }
}

/// Returns the value of the first field with the given tag, scanning field boundaries from the start of the payload.
///
/// Scanning stops at the first malformed field; a tag that only appears after that point is reported as absent.
pub fn extract_field(payload: &str, tag: &str) -> Option<String> {
    FieldScanner::new(payload).map_while(Result::ok).find(|(t, _)| *t == tag).map(|(_, v)| v.to_string())
}

/// Returns the value of the sub-field `inner` of the composite field `outer`.
pub fn extract_nested_field(payload: &str, outer: &str, inner: &str) -> Option<String> {
    extract_field(&extract_field(payload, outer)?, inner)
}

/// Sets `tag` to `value` and returns the re-serialized payload. See [`TlvPayload::set`] for placement rules.
pub fn replace_field(payload: &str, tag: &str, value: &str) -> Result<String, QrisError> {
    let mut tlv = TlvPayload::parse(payload)?;
    tlv.set(tag, value)?;
    Ok(tlv.to_string())
}

fn check_tag(tag: &str) -> Result<(), QrisError> {
    if tag.len() == 2 && tag.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(QrisError::InvalidTag(tag.to_string()))
    }
}

/// Splits off the first `n` characters of `s`, or `None` if `s` is shorter than that.
fn split_chars(s: &str, n: usize) -> Option<(&str, &str)> {
    match s.char_indices().nth(n) {
        Some((i, _)) => Some(s.split_at(i)),
        None if s.chars().count() == n => Some((s, "")),
        None => None,
    }
}

/// Walks a payload field by field, yielding `(tag, value)` pairs. After the first error it yields nothing more.
struct FieldScanner<'a> {
    rest: &'a str,
    offset: usize,
}

impl<'a> FieldScanner<'a> {
    fn new(payload: &'a str) -> Self {
        Self { rest: payload, offset: 0 }
    }

    fn malformed(&mut self, reason: &str) -> QrisError {
        let err = QrisError::MalformedPayload(format!("{reason} at character {}", self.offset));
        self.rest = "";
        err
    }
}

impl<'a> Iterator for FieldScanner<'a> {
    type Item = Result<(&'a str, &'a str), QrisError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let Some((tag, rest)) = split_chars(self.rest, 2) else {
            return Some(Err(self.malformed("truncated tag")));
        };
        if check_tag(tag).is_err() {
            return Some(Err(self.malformed("non-numeric tag")));
        }
        let Some((len, rest)) = split_chars(rest, 2) else {
            return Some(Err(self.malformed("truncated length")));
        };
        let Ok(len) = len.parse::<usize>() else {
            return Some(Err(self.malformed("non-numeric length")));
        };
        let Some((value, rest)) = split_chars(rest, len) else {
            return Some(Err(self.malformed("value shorter than its declared length")));
        };
        self.rest = rest;
        self.offset += 4 + len;
        Some(Ok((tag, value)))
    }
}

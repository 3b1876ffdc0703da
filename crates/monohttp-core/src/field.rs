//! The lazy, case-insensitive field store.
//!
//! One [`Field`] holds every value received for one header (or trailer) name.
//! The raw strings are kept exactly as received; lexing and structured
//! parsing run once, on first access to [`Field::raw`] or
//! [`Field::elements`], and both lists are memoized together.

use std::cell::OnceCell;
use std::collections::HashMap;

use crate::fieldlex;
use crate::fieldparse::{self, Element, ValueOutcome};

/// One header name and its aggregated values.
#[derive(Debug, Default)]
pub struct Field {
    unvalidated: Vec<String>,
    parsed: OnceCell<Parsed>,
}

#[derive(Debug)]
struct Parsed {
    raw: Vec<String>,
    elements: Vec<Element>,
}

impl Field {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, value: &str) {
        debug_assert!(
            self.parsed.get().is_none(),
            "field value appended after parsing was forced"
        );
        self.unvalidated.push(value.to_string());
    }

    /// Every value exactly as received, in arrival order.
    pub fn unvalidated(&self) -> &[String] {
        &self.unvalidated
    }

    /// The values that passed lexer validation, in arrival order.
    pub fn raw(&self) -> &[String] {
        &self.force().raw
    }

    /// The structured elements aggregated across all accepted values, in
    /// arrival order.
    pub fn elements(&self) -> &[Element] {
        &self.force().elements
    }

    /// Joins the accepted values with `sep`.
    pub fn concat(&self, sep: &str) -> String {
        self.raw().join(sep)
    }

    /// Returns true if any element's value equals `value`.
    pub fn contains_value(&self, value: &str) -> bool {
        self.elements().iter().any(|e| e.value() == Some(value))
    }

    /// Returns every element whose value equals `value`.
    pub fn find_elements(&self, value: &str) -> Vec<&Element> {
        self.elements()
            .iter()
            .filter(|e| e.value() == Some(value))
            .collect()
    }

    fn force(&self) -> &Parsed {
        self.parsed.get_or_init(|| {
            let mut raw = Vec::new();
            let mut elements = Vec::new();
            for value in &self.unvalidated {
                match fieldparse::parse_value(value) {
                    ValueOutcome::Structured(mut parsed) => {
                        raw.push(value.clone());
                        elements.append(&mut parsed);
                    }
                    ValueOutcome::Unstructured => raw.push(value.clone()),
                    ValueOutcome::Rejected | ValueOutcome::Abandoned => {}
                }
            }
            Parsed { raw, elements }
        })
    }
}

/// Case-insensitive map of field name to [`Field`]. Keys are stored
/// lowercased; lookups fold case.
#[derive(Debug, Default)]
pub struct FieldMap {
    inner: HashMap<String, Field>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one received value under `name`.
    pub fn append(&mut self, name: &str, value: &str) {
        self.inner
            .entry(name.to_ascii_lowercase())
            .or_insert_with(Field::new)
            .push(value);
    }

    /// Looks up a field, folding case.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.inner.get(&name.to_ascii_lowercase())
    }

    /// Returns true if `name` was received at least once.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over `(lowercased name, field)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.inner.iter().map(|(name, field)| (name.as_str(), field))
    }
}

/// Parses one header or trailer line.
///
/// The line must be `name ":" OWS value OWS CRLF` with a token name; OWS
/// around the value is trimmed, the name's case is preserved. Returns `None`
/// for anything else (including a missing `\r`).
pub fn parse_field_line(line: &[u8]) -> Option<(String, String)> {
    let body = line.strip_suffix(b"\r\n")?;
    let colon = body.iter().position(|&b| b == b':')?;
    let name = &body[..colon];
    if name.is_empty() || !name.iter().all(|&b| fieldlex::is_tchar(b)) {
        return None;
    }
    let value = &body[colon + 1..];
    if !value.iter().all(|&b| fieldlex::is_field_content(b)) {
        return None;
    }
    let name = std::str::from_utf8(name).ok()?;
    let value = std::str::from_utf8(value).ok()?;
    Some((name.to_string(), value.trim_matches([' ', '\t']).to_string()))
}

//! Multipart form data and the wrapper seam used for it.
//!
//! `FormData` is the native representation every transport accepts. Callers
//! that build forms incrementally may hand the client a [`FormDataWrapper`]
//! instead; the dispatcher unwraps it before a transport is chosen.

use std::fmt;

use uuid::Uuid;

/// One value in a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// Ordered multipart form entries. Duplicate names are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: FormValue) {
        self.entries.push((name.into(), value));
    }

    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.append(name, FormValue::Text(value.into()));
    }

    pub fn entries(&self) -> &[(String, FormValue)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode as `multipart/form-data` with a fresh random boundary.
    /// Returns the `Content-Type` value and the encoded body.
    pub fn to_multipart(&self) -> (String, Vec<u8>) {
        let boundary = format!("xhr-{}", Uuid::new_v4().simple());
        let body = self.encode_with_boundary(&boundary);
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    fn encode_with_boundary(&self, boundary: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in &self.entries {
            out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match value {
                FormValue::Text(text) => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", escape(name))
                            .as_bytes(),
                    );
                    out.extend_from_slice(text.as_bytes());
                }
                FormValue::File {
                    filename,
                    content_type,
                    bytes,
                } => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {content_type}\r\n\r\n",
                            escape(name),
                            escape(filename)
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(bytes);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        out
    }
}

fn escape(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// A form-data value that must be unwrapped before transport.
pub trait FormDataWrapper: fmt::Debug + Send + Sync {
    /// Produce the native form data.
    fn to_form_data(&self) -> FormData;
}

/// Stock wrapper: entries keyed by name, supporting replace and delete,
/// serialized in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct OrderedFormData {
    entries: Vec<(String, FormValue)>,
}

impl OrderedFormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), FormValue::Text(value.into())));
    }

    /// Replace every entry named `name` with a single one, keeping the
    /// position of the first.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = FormValue::Text(value.into());
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut index = 0;
                self.entries.retain(|(n, _)| {
                    let keep = index <= first || n != name;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }
}

impl FormDataWrapper for OrderedFormData {
    fn to_form_data(&self) -> FormData {
        FormData {
            entries: self.entries.clone(),
        }
    }
}

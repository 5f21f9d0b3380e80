//! Load requests and their tokenization into label groups
//!
//! A [`Request`] is the closed set of shapes a caller may hand to
//! [`Loader::load`](crate::core::Loader::load). Tokenizing flattens any
//! request tree into parallel label / file-list sequences.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

/// A request to load one or more resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Request {
    /// Absent request. Contributes no label.
    #[default]
    None,
    /// A bare path whose label is derived from its file name.
    SingleFile(String),
    /// Several bare paths, each labelled by its own file name.
    FileList(Vec<String>),
    /// Explicit label to files mapping, in caller order. `None` registers the
    /// label with no files.
    LabeledFiles(Vec<(String, Option<Vec<String>>)>),
    /// Arbitrarily nested requests, flattened in order.
    Nested(Vec<Request>),
}

impl Request {
    /// A single explicit label covering `files`.
    pub fn labeled<L, I, F>(label: L, files: I) -> Self
    where
        L: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        let files: Vec<String> = files.into_iter().map(Into::into).collect();
        let files = if files.is_empty() { None } else { Some(files) };
        Request::LabeledFiles(vec![(label.into(), files)])
    }

    /// Labels this request would register, in order.
    pub fn labels(&self) -> Vec<String> {
        tokenize(std::iter::once(self)).labels
    }
}

impl From<&str> for Request {
    fn from(path: &str) -> Self {
        Request::SingleFile(path.to_string())
    }
}

impl From<String> for Request {
    fn from(path: String) -> Self {
        Request::SingleFile(path)
    }
}

impl From<Vec<&str>> for Request {
    fn from(paths: Vec<&str>) -> Self {
        Request::FileList(paths.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Request {
    fn from(paths: Vec<String>) -> Self {
        Request::FileList(paths)
    }
}

impl<const N: usize> From<[&str; N]> for Request {
    fn from(paths: [&str; N]) -> Self {
        Request::FileList(paths.iter().map(|p| p.to_string()).collect())
    }
}

impl From<Vec<Request>> for Request {
    fn from(requests: Vec<Request>) -> Self {
        Request::Nested(requests)
    }
}

impl<T: Into<Request>> From<Option<T>> for Request {
    fn from(request: Option<T>) -> Self {
        request.map_or(Request::None, Into::into)
    }
}

/// Tokenizer output: parallel label and file-list sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    pub labels: Vec<String>,
    pub files: Vec<Vec<String>>,
}

impl Tokens {
    fn push(&mut self, label: String, files: Vec<String>) {
        self.labels.push(label);
        self.files.push(files);
    }

    /// Number of label groups
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate (label, files) pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.files.iter().map(Vec::as_slice))
    }
}

/// Flatten requests into label / file-list pairs.
pub fn tokenize<'a, I>(requests: I) -> Tokens
where
    I: IntoIterator<Item = &'a Request>,
{
    let mut tokens = Tokens::default();
    for request in requests {
        tokenize_into(request, &mut tokens);
    }
    tokens
}

fn tokenize_into(request: &Request, tokens: &mut Tokens) {
    match request {
        Request::None => {}
        Request::SingleFile(path) => tokens.push(label_from_file(path), vec![path.clone()]),
        Request::FileList(paths) => {
            for path in paths {
                tokens.push(label_from_file(path), vec![path.clone()]);
            }
        }
        Request::LabeledFiles(entries) => {
            for (label, files) in entries {
                let files = files.clone().unwrap_or_default();
                let label = if label.is_empty() {
                    match files.first() {
                        Some(first) if !first.is_empty() => first.clone(),
                        // nothing to name it by
                        _ => continue,
                    }
                } else {
                    label.clone()
                };
                tokens.push(label, files);
            }
        }
        Request::Nested(requests) => {
            for request in requests {
                tokenize_into(request, tokens);
            }
        }
    }
}

/// Derive a label from a path: the segment after the last `/`, up to any `?`.
pub fn label_from_file(file: &str) -> String {
    let start = file.rfind('/').map_or(0, |s| s + 1);
    let name = &file[start..];
    match name.rfind('?') {
        Some(end) => name[..end].to_string(),
        None => name.to_string(),
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum LabeledValue {
    One(String),
    Many(Vec<String>),
}

impl LabeledValue {
    fn into_files(self) -> Option<Vec<String>> {
        match self {
            LabeledValue::One(file) if file.is_empty() => None,
            LabeledValue::One(file) => Some(vec![file]),
            LabeledValue::Many(files) if files.is_empty() => None,
            LabeledValue::Many(files) => Some(files),
        }
    }
}

struct RequestVisitor;

impl<'de> Visitor<'de> for RequestVisitor {
    type Value = Request;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("null, a path, a list of requests, or a label to files mapping")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Request, E> {
        Ok(Request::None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Request, E> {
        Ok(Request::None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Request, D::Error> {
        Request::deserialize(deserializer)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Request, E> {
        Ok(Request::SingleFile(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Request, E> {
        Ok(Request::SingleFile(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Request, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<Request>()? {
            items.push(item);
        }

        if items.iter().all(|item| matches!(item, Request::SingleFile(_))) {
            let paths = items
                .into_iter()
                .filter_map(|item| match item {
                    Request::SingleFile(path) => Some(path),
                    _ => None,
                })
                .collect();
            Ok(Request::FileList(paths))
        } else {
            Ok(Request::Nested(items))
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Request, A::Error> {
        let mut entries = Vec::new();
        while let Some((label, value)) = map.next_entry::<String, Option<LabeledValue>>()? {
            entries.push((label, value.and_then(LabeledValue::into_files)));
        }
        Ok(Request::LabeledFiles(entries))
    }
}

impl<'de> Deserialize<'de> for Request {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RequestVisitor)
    }
}

use http::header::{HeaderMap, HeaderName};

/// The header block of a part.
///
/// Lookups ignore ASCII case. Names that are valid HTTP header names are kept
/// in a [`HeaderMap`]; anything else a producer put before the colon (such
/// as `X Custom`) is kept verbatim alongside, so an unusual name never aborts
/// the stream. A repeated name keeps the last value.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    map: HeaderMap<String>,
    other: Vec<(String, String)>,
}

impl Headers {
    pub(crate) fn insert(&mut self, name: &str, value: String) {
        match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => {
                self.map.insert(name, value);
            }
            Err(_) => match self.other.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some(entry) => entry.1 = value,
                None => self.other.push((name.to_owned(), value)),
            },
        }
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut String> {
        match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => self.map.get_mut(name),
            Err(_) => self
                .other
                .iter_mut()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v),
        }
    }

    /// The value of header `name`, ignoring ASCII case.
    pub fn get<N: AsRef<str>>(&self, name: N) -> Option<&str> {
        let name = name.as_ref();
        match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => self.map.get(name).map(String::as_str),
            Err(_) => self
                .other
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
        }
    }

    pub fn contains<N: AsRef<str>>(&self, name: N) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every header as a `(name, value)` pair. Names valid in HTTP come first,
    /// lowercased.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .chain(self.other.iter().map(|(n, v)| (n.as_str(), v.as_str())))
    }

    /// The headers whose names are valid HTTP header names.
    pub fn as_header_map(&self) -> &HeaderMap<String> {
        &self.map
    }
}

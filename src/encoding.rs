//! Gateway wire dialect: ordered field maps and the `key=value&...` encoding
//! the gateway uses for both its initiate and poll response bodies.
//!
//! Field order matters: the signature is computed over field values in the
//! order they were supplied, so the parser must preserve the order of the
//! transport encoding and decode each value exactly once.

/// An ordered list of named string fields.
///
/// Deliberately not a hash map: signature canonicalization depends on a
/// deterministic iteration order, and the gateway is free to send duplicate
/// or unrecognized keys which must still participate in the signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value for an exact key match, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Borrow the underlying pairs, e.g. for form-encoding an outbound body.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Fields {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parse a gateway response or webhook body: `key=value` pairs joined by
/// `&`, percent-decoded once, order preserved.
pub fn parse(body: &str) -> Fields {
    form_urlencoded::parse(body.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

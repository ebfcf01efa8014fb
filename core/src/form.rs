//! Form parameters for request bodies and query strings.
//!
//! # Design
//! Keys live in a `BTreeMap`, so iteration is always in canonical (sorted)
//! order. That order is what `encode` writes and what the OAuth signer sees,
//! which keeps the wire bytes and the signature base string in agreement.
//! Values under one key keep their insertion order.

use std::collections::BTreeMap;

use url::form_urlencoded;

/// A multi-valued `application/x-www-form-urlencoded` parameter set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    params: BTreeMap<String, Vec<String>>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` under `key`, keeping any existing values.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Replace all values under `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.insert(key.into(), vec![value.into()]);
        self
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.params.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.params.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.values().all(Vec::is_empty)
    }

    /// Number of key/value pairs, counting repeated keys once per value.
    pub fn len(&self) -> usize {
        self.params.values().map(Vec::len).sum()
    }

    /// Key/value pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// URL-encode the form, keys sorted.
    ///
    /// ```
    /// use maxcdn_core::Form;
    ///
    /// let form = Form::from([("file", "/master.css")]);
    /// assert_eq!(form.encode(), "file=%2Fmaster.css");
    /// ```
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Form {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = Form::new();
        for (k, v) in iter {
            form.add(k, v);
        }
        form
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Form {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_form_encodes_to_empty_string() {
        let form = Form::new();
        assert!(form.is_empty());
        assert_eq!(form.len(), 0);
        assert_eq!(form.encode(), "");
    }

    #[test]
    fn keys_are_sorted_values_keep_order() {
        let mut form = Form::new();
        form.add("zeta", "1").add("alpha", "b").add("alpha", "a");
        assert_eq!(form.encode(), "alpha=b&alpha=a&zeta=1");
        assert_eq!(form.len(), 3);
    }

    #[test]
    fn set_replaces_previous_values() {
        let mut form = Form::from([("name", "foo"), ("name", "bar")]);
        assert_eq!(form.get_all("name"), ["foo", "bar"]);
        form.set("name", "baz");
        assert_eq!(form.get("name"), Some("baz"));
        assert_eq!(form.get_all("name").len(), 1);
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let form = Form::from([("label", "a b&c=d")]);
        assert_eq!(form.encode(), "label=a+b%26c%3Dd");
    }

    #[test]
    fn repeated_array_keys() {
        let form: Form = ["/master.css", "/master.js"]
            .into_iter()
            .map(|path| ("files[]", path))
            .collect();
        assert_eq!(
            form.encode(),
            "files%5B%5D=%2Fmaster.css&files%5B%5D=%2Fmaster.js"
        );
    }

    #[test]
    fn missing_key() {
        let form = Form::new();
        assert_eq!(form.get("nope"), None);
        assert!(form.get_all("nope").is_empty());
    }
}

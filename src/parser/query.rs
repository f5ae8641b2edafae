use sha2::{Digest, Sha256};
use std::fmt;

/// Cache key derived from query text: hex SHA-256 of the trimmed, lower-cased query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueryKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

#[must_use]
pub fn query_key(query: &str) -> QueryKey {
    let digest = Sha256::digest(normalize_query(query).as_bytes());
    QueryKey(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace_collapse() {
        let a = query_key("Peanut Butter");
        let b = query_key(" peanut butter ");
        let c = query_key("PEANUT BUTTER");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_key_shape() {
        let key = query_key("jif");
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_distinct_queries_differ() {
        assert_ne!(query_key("peanut butter"), query_key("almond butter"));
        // Inner whitespace is significant
        assert_ne!(query_key("peanut butter"), query_key("peanut  butter"));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            query_key("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}

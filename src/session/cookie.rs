//! Ordered cookie storage and `Set-Cookie` parsing.

/// Extract `(name, value)` from a `Set-Cookie` header value.
///
/// Attributes after the first `;` (Path, HttpOnly, Expires, ...) are ignored.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// Cookie name -> value, keeping first-insertion order for header rebuilding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced cookie keeps its original position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.cookies.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.cookies.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Merge parsed `Set-Cookie` values; returns how many were accepted.
    pub fn merge_set_cookies<'a>(&mut self, headers: impl IntoIterator<Item = &'a str>) -> usize {
        let mut merged = 0;
        for (name, value) in headers.into_iter().filter_map(parse_set_cookie) {
            self.set(name, value);
            merged += 1;
        }
        merged
    }

    /// `name=value` pairs joined with `; `, or `None` for an empty jar.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(n, v)| format!("{}={}", n, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_cookie() {
        assert_eq!(
            parse_set_cookie("sid=abc123; Path=/; HttpOnly"),
            Some(("sid".into(), "abc123".into()))
        );
        assert_eq!(
            parse_set_cookie("token=a=b; Secure"),
            Some(("token".into(), "a=b".into()))
        );
        assert_eq!(parse_set_cookie("empty="), Some(("empty".into(), "".into())));
        assert_eq!(parse_set_cookie("HttpOnly"), None);
        assert_eq!(parse_set_cookie(" =orphan"), None);
    }

    #[test]
    fn test_header_value_keeps_insertion_order() {
        let mut jar = CookieJar::new();
        assert_eq!(jar.header_value(), None);

        jar.set("b", "2");
        jar.set("a", "1");
        jar.set("b", "3");
        assert_eq!(jar.header_value().as_deref(), Some("b=3; a=1"));
        assert_eq!(jar.get("b"), Some("3"));
        assert_eq!(jar.len(), 2);
    }

    #[test]
    fn test_merge_skips_malformed_values() {
        let mut jar = CookieJar::new();
        let merged = jar.merge_set_cookies(["a=1", "garbage", "b=2; Max-Age=60"]);
        assert_eq!(merged, 2);
        assert_eq!(jar.header_value().as_deref(), Some("a=1; b=2"));

        jar.clear();
        assert!(jar.is_empty());
    }
}

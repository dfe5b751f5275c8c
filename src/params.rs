/// A parsed `;`-separated parameter list such as the value of a
/// `Content-Disposition` or `Content-Type` header.
///
/// Each entry is either a bare `token` (recorded with no value) or a
/// `token=value` pair. Quoted values keep any backslash escapes verbatim; only
/// the surrounding quotes are removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, Option<String>)>,
}

impl Params {
    /// Parses a parameter list. Entries with an empty name are skipped.
    pub fn parse(input: &str) -> Params {
        let mut params = Params::default();
        let mut cursor = Cursor { input, pos: 0 };

        while cursor.has_char() {
            let name = cursor.parse_token(b"=;");
            let mut value = None;

            if cursor.peek() == Some(b'=') {
                cursor.pos += 1;
                value = cursor.parse_quoted_token(b";");
            }

            if cursor.peek() == Some(b';') {
                cursor.pos += 1;
            }

            if let Some(name) = name {
                params.insert(name.to_owned(), value.map(str::to_owned));
            }
        }

        params
    }

    fn insert(&mut self, name: String, value: Option<String>) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// The value of parameter `name`. A parameter present without a value
    /// yields `None`, as does an absent one; use [`contains`](Self::contains)
    /// to tell them apart.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the parameters in the order they first appeared.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn has_char(&self) -> bool {
        self.pos < self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn parse_token(&mut self, terminators: &[u8]) -> Option<&'a str> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if terminators.contains(&ch) {
                break;
            }
            self.pos += 1;
        }
        self.token(start, false)
    }

    /// Like [`parse_token`](Self::parse_token) but terminators inside double
    /// quotes do not end the token, and `\"` does not close a quote.
    fn parse_quoted_token(&mut self, terminators: &[u8]) -> Option<&'a str> {
        let start = self.pos;
        let mut quoted = false;
        let mut escaped = false;

        while let Some(ch) = self.peek() {
            if !quoted && terminators.contains(&ch) {
                break;
            }
            if !escaped && ch == b'"' {
                quoted = !quoted;
            }
            escaped = !escaped && ch == b'\\';
            self.pos += 1;
        }
        self.token(start, true)
    }

    // Delimiters and whitespace are ASCII, so every slice boundary below
    // falls on a char boundary.
    fn token(&self, start: usize, strip_quotes: bool) -> Option<&'a str> {
        let mut token = self.input[start..self.pos].trim_matches(|c: char| c.is_ascii_whitespace());

        if strip_quotes && token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
            token = &token[1..token.len() - 1];
        }

        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsing() {
        let params = Params::parse("test; test1 =  stuff   ; test2 =  \"stuff; stuff\"; test3=\"stuff");
        assert!(params.contains("test"));
        assert_eq!(params.get("test"), None);
        assert_eq!(params.get("test1"), Some("stuff"));
        assert_eq!(params.get("test2"), Some("stuff; stuff"));
        assert_eq!(params.get("test3"), Some("\"stuff"));

        let params = Params::parse("  test");
        assert!(params.contains("test"));
        assert_eq!(params.get("test"), None);

        assert!(Params::parse("  ").is_empty());
        assert!(Params::parse(" = stuff ").is_empty());
    }

    #[test]
    fn test_parsing_escaped_chars() {
        let params = Params::parse("param = \"stuff\\\"; more stuff\"");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("param"), Some("stuff\\\"; more stuff"));

        let params = Params::parse("param = \"stuff\\\\\"; anotherparam");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("param"), Some("stuff\\\\"));
        assert!(params.contains("anotherparam"));
        assert_eq!(params.get("anotherparam"), None);
    }

    #[test]
    fn test_content_disposition_values() {
        let params = Params::parse("form-data; name=\"my field\"; filename=\"你好.txt\"");
        assert!(params.contains("form-data"));
        assert_eq!(params.get("name"), Some("my field"));
        assert_eq!(params.get("filename"), Some("你好.txt"));
        assert_eq!(
            params.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            vec!["form-data", "name", "filename"]
        );

        let params = Params::parse("multipart/mixed; boundary=BbC04y");
        assert_eq!(params.get("boundary"), Some("BbC04y"));
    }

    #[test]
    fn test_repeated_name_keeps_last_value() {
        let params = Params::parse("name=a; name=b");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("name"), Some("b"));
    }
}

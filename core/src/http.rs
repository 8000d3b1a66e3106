//! HTTP value types shared by the builder and the transports.
//!
//! # Design
//! These are plain data: a method enum, an ordered parameter list, header
//! line helpers and the response a transport hands back. Everything is owned
//! so a `Response` outlives the handle that produced it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::options::upsert;

/// Content type used for bodies built from request parameters.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a verb after trimming and upper-casing it, so `" patch "` is `Patch`.
impl FromStr for Method {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(RequestError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Request parameters in insertion order. Re-inserting a name overwrites its
/// value without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        upsert(&mut self.0, name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` rendering, used both as a query
    /// string and as a form body.
    pub fn encode(&self) -> Result<String, RequestError> {
        Ok(serde_urlencoded::to_string(&self.0)?)
    }
}

/// Trims and lower-cases a header name, then upper-cases its first character:
/// `"CONTENT-TYPE"` becomes `"Content-type"`.
pub fn normalize_header_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Splits a `"Name: value"` line. Returns `None` when there is no colon or
/// the name is blank.
pub fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

/// A completed transfer: the raw body plus transport metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
    /// URL the request was sent to, including any query string.
    pub url: String,
    /// Outgoing request line and headers, when header capture is enabled.
    pub request_header: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_normalizes_case_and_whitespace() {
        assert_eq!(" patch ".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!("Delete".parse::<Method>().unwrap(), Method::Delete);
        assert_eq!("\tget\n".parse::<Method>().unwrap(), Method::Get);
    }

    #[test]
    fn method_parse_rejects_unknown_verbs() {
        let err = "BREW".parse::<Method>().unwrap_err();
        assert!(matches!(err, RequestError::UnsupportedMethod(ref m) if m == "BREW"));
    }

    #[test]
    fn method_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Method::Patch).unwrap(), r#""PATCH""#);
    }

    #[test]
    fn header_name_is_capitalized_once() {
        assert_eq!(normalize_header_name("content-type"), "Content-type");
        assert_eq!(normalize_header_name("X-API-KEY"), "X-api-key");
        assert_eq!(normalize_header_name("  accept "), "Accept");
        assert_eq!(normalize_header_name(""), "");
    }

    #[test]
    fn header_line_splits_on_first_colon() {
        assert_eq!(
            split_header_line("Referer: http://a/b"),
            Some(("Referer", "http://a/b"))
        );
        assert_eq!(split_header_line("no colon"), None);
        assert_eq!(split_header_line(": v"), None);
        assert_eq!(split_header_line("   : v"), None);
    }

    #[test]
    fn params_keep_insertion_order_on_overwrite() {
        let mut params = Params::default();
        params.insert("foo", "bar");
        params.insert("baz", "quux");
        params.insert("foo", "again");
        assert_eq!(params.encode().unwrap(), "foo=again&baz=quux");
        assert_eq!(params.get("foo"), Some("again"));
    }

    #[test]
    fn params_encode_reserved_characters() {
        let mut params = Params::default();
        params.insert("q", "a b&c=d");
        params.insert("emoji", "é");
        assert_eq!(params.encode().unwrap(), "q=a+b%26c%3Dd&emoji=%C3%A9");
    }

    #[test]
    fn empty_params_encode_to_empty_string() {
        assert_eq!(Params::default().encode().unwrap(), "");
    }
}

//! Transport options: identifiers, values and the ordered store that records
//! them.
//!
//! # Design
//! Options are stored in first-application order and a later write for the
//! same id replaces the value in place. Replaying the store therefore
//! reproduces the original application order, which is what restoring a
//! persisted request relies on.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifier of a transport-level option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionId {
    /// HTTP verb sent on the request line.
    CustomRequest,
    /// Effective target URL; defaults to the URI the handle was opened with.
    Url,
    /// Request body, already encoded.
    PostFields,
    /// Outgoing header lines, `"Name: value"` each.
    HttpHeader,
    /// Return the body as data instead of writing it to stdout.
    ReturnTransfer,
    /// Prepend the response status line and headers to the body.
    Header,
    /// Capture the outgoing header block for diagnostics.
    HeaderOut,
    /// Whole-transfer timeout in seconds.
    Timeout,
    /// Connect timeout in seconds.
    ConnectTimeout,
    FollowLocation,
    MaxRedirects,
    SslVerifyPeer,
    Proxy,
    UserAgent,
    /// Transport-specific option not modelled above.
    Custom(String),
}

impl OptionId {
    pub fn as_str(&self) -> &str {
        match self {
            OptionId::CustomRequest => "custom_request",
            OptionId::Url => "url",
            OptionId::PostFields => "post_fields",
            OptionId::HttpHeader => "http_header",
            OptionId::ReturnTransfer => "return_transfer",
            OptionId::Header => "header",
            OptionId::HeaderOut => "header_out",
            OptionId::Timeout => "timeout",
            OptionId::ConnectTimeout => "connect_timeout",
            OptionId::FollowLocation => "follow_location",
            OptionId::MaxRedirects => "max_redirects",
            OptionId::SslVerifyPeer => "ssl_verify_peer",
            OptionId::Proxy => "proxy",
            OptionId::UserAgent => "user_agent",
            OptionId::Custom(name) => name,
        }
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a transport option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptionValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Int(i64::from(value))
    }
}

/// Whole seconds; sub-second precision is dropped.
impl From<Duration> for OptionValue {
    fn from(value: Duration) -> Self {
        OptionValue::Int(i64::try_from(value.as_secs()).unwrap_or(i64::MAX))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::List(value)
    }
}

/// Ordered option store; last write for an id wins, first write fixes the
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Vec<(OptionId, OptionValue)>);

impl Options {
    pub fn set(&mut self, id: OptionId, value: OptionValue) {
        upsert(&mut self.0, id, value);
    }

    pub fn get(&self, id: &OptionId) -> Option<&OptionValue> {
        self.0.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OptionId, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub(crate) fn upsert<K: PartialEq, V>(entries: &mut Vec<(K, V)>, key: K, value: V) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_keeps_first_position() {
        let mut options = Options::default();
        options.set(OptionId::Timeout, 5u32.into());
        options.set(OptionId::Proxy, "http://proxy:8080".into());
        options.set(OptionId::Timeout, 10u32.into());

        let order: Vec<_> = options.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(order, vec![OptionId::Timeout, OptionId::Proxy]);
        assert_eq!(options.get(&OptionId::Timeout), Some(&OptionValue::Int(10)));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn serializes_as_ordered_pairs() {
        let mut options = Options::default();
        options.set(OptionId::ReturnTransfer, true.into());
        options.set(OptionId::Custom("x_trace".to_string()), "on".into());

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                ["return_transfer", {"bool": true}],
                [{"custom": "x_trace"}, {"text": "on"}]
            ])
        );
        let back: Options = serde_json::from_value(json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn duration_converts_to_whole_seconds() {
        let value = OptionValue::from(Duration::from_millis(2500));
        assert_eq!(value.as_int(), Some(2));
    }

    #[test]
    fn integer_reads_as_bool() {
        assert_eq!(OptionValue::Int(0).as_bool(), Some(false));
        assert_eq!(OptionValue::Int(1).as_bool(), Some(true));
        assert_eq!(OptionValue::Text("1".into()).as_bool(), None);
    }
}

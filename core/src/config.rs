//! Persistable request configuration.
//!
//! # Design
//! `RequestConfig` is everything a `Request` knows except its live transport
//! handle. It is what gets serialized; restoring a request opens a new handle
//! and replays `options` from here.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::{Method, Params};
use crate::options::Options;

/// Which response statuses count as success.
///
/// `Exact200` is the default: only status 200 succeeds, so 201, 204 and 3xx
/// are reported as server errors even though HTTP treats them as
/// non-errors. `Any2xx` follows conventional HTTP semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuccessPolicy {
    #[default]
    #[serde(rename = "exact_200")]
    Exact200,
    #[serde(rename = "any_2xx")]
    Any2xx,
}

impl SuccessPolicy {
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            SuccessPolicy::Exact200 => status == 200,
            SuccessPolicy::Any2xx => (200..300).contains(&status),
        }
    }
}

/// Inert form of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    pub uri: String,
    pub method: Method,
    #[serde(default)]
    pub params: Params,
    /// `"Name: value"` lines in the order they were added.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Every option applied so far, in first-application order.
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub success: SuccessPolicy,
}

impl RequestConfig {
    pub fn new(uri: impl Into<String>, method: Method) -> Self {
        Self {
            uri: uri.into(),
            method,
            params: Params::default(),
            headers: Vec::new(),
            options: Options::default(),
            success: SuccessPolicy::default(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

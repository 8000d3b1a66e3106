//! One-shot request builder.
//!
//! # Design
//! `Request` owns a transport handle from construction until `send`. Builder
//! calls record configuration in a `RequestConfig`; options are also pushed
//! to the handle immediately. `send` finalizes target and body, performs the
//! transfer and drops the handle before classifying the outcome, so the
//! handle is closed whichever way the call returns. A sent request keeps its
//! configuration but has no handle; further sends fail with
//! `RequestError::Reuse`.

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::config::{RequestConfig, SuccessPolicy};
use crate::error::{RequestError, Result};
use crate::http::{normalize_header_name, Method, Params, Response};
use crate::options::{OptionId, OptionValue, Options};
use crate::transport::{HandleGuard, Transport, TransportHandle};

/// A single HTTP request, configured then sent once.
pub struct Request<H: TransportHandle> {
    config: RequestConfig,
    handle: Option<HandleGuard<H>>,
}

impl<H: TransportHandle> Request<H> {
    /// GET request for `uri`.
    pub fn new<T>(transport: &T, uri: impl Into<String>) -> Result<Self>
    where
        T: Transport<Handle = H>,
    {
        Self::restore(transport, RequestConfig::new(uri, Method::Get))
    }

    /// Request for `uri` with a method given as text, e.g. `"post"`.
    pub fn with_method_str<T>(transport: &T, uri: impl Into<String>, method: &str) -> Result<Self>
    where
        T: Transport<Handle = H>,
    {
        let method = method.parse()?;
        Self::restore(transport, RequestConfig::new(uri, method))
    }

    /// Rebuilds a request from its persisted configuration: opens a fresh
    /// handle, applies the baseline options, then replays every stored option
    /// in its original order.
    pub fn restore<T>(transport: &T, config: RequestConfig) -> Result<Self>
    where
        T: Transport<Handle = H>,
    {
        let handle = transport.open(&config.uri)?;
        let stored = config.options.clone();
        let mut request = Self {
            config,
            handle: Some(HandleGuard::new(handle)),
        };
        request.bootstrap()?;

        if let Some(handle) = request.handle.as_mut() {
            for (id, value) in stored.iter() {
                apply(&mut request.config.options, &mut **handle, id.clone(), value.clone())?;
            }
        }
        debug!(
            uri = %request.config.uri,
            method = %request.config.method,
            replayed = stored.len(),
            "request initialized"
        );
        Ok(request)
    }

    /// Deserializes a configuration produced by `to_json` and restores it.
    pub fn from_json<T>(transport: &T, json: &str) -> Result<Self>
    where
        T: Transport<Handle = H>,
    {
        Self::restore(transport, RequestConfig::from_json(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        self.config.to_json()
    }

    fn bootstrap(&mut self) -> Result<()> {
        let method = self.config.method;
        self.with_option(OptionId::CustomRequest, method.as_str())?;
        self.with_option(OptionId::ReturnTransfer, true)?;
        self.with_option(OptionId::Header, false)?;
        self.with_option(OptionId::HeaderOut, true)?;
        Ok(())
    }

    /// Sets a parameter. GET requests send parameters as the query string,
    /// other methods as a form body.
    pub fn with_param(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.config.params.insert(name, value);
        self
    }

    /// Appends a header. Repeated names are all sent.
    pub fn with_header(&mut self, name: &str, value: impl AsRef<str>) -> &mut Self {
        let name = normalize_header_name(name);
        self.config
            .headers
            .push(format!("{}: {}", name, value.as_ref()));
        self
    }

    pub fn with_method(&mut self, method: &str) -> Result<&mut Self> {
        let method: Method = method.parse()?;
        self.with_option(OptionId::CustomRequest, method.as_str())?;
        self.config.method = method;
        Ok(self)
    }

    /// Applies a transport option to the live handle and records it.
    pub fn with_option(&mut self, id: OptionId, value: impl Into<OptionValue>) -> Result<&mut Self> {
        let handle = self.handle.as_mut().ok_or(RequestError::Reuse)?;
        apply(&mut self.config.options, &mut **handle, id, value.into())?;
        Ok(self)
    }

    pub fn with_success_policy(&mut self, policy: SuccessPolicy) -> &mut Self {
        self.config.success = policy;
        self
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn uri(&self) -> &str {
        &self.config.uri
    }

    pub fn method(&self) -> Method {
        self.config.method
    }

    pub fn params(&self) -> &Params {
        &self.config.params
    }

    pub fn headers(&self) -> &[String] {
        &self.config.headers
    }

    pub fn options(&self) -> &Options {
        &self.config.options
    }

    pub fn is_sent(&self) -> bool {
        self.handle.is_none()
    }

    /// Sends the request and returns the response body.
    pub fn send(&mut self) -> Result<String> {
        self.execute().map(|response| response.body)
    }

    /// Sends the request and returns the body with its transfer metadata.
    pub fn execute(&mut self) -> Result<Response> {
        let mut handle = self.handle.take().ok_or(RequestError::Reuse)?;

        let (id, value) = if self.config.method == Method::Get {
            let url = format!("{}?{}", self.config.uri, self.config.params.encode()?);
            (OptionId::Url, OptionValue::Text(url))
        } else {
            (OptionId::PostFields, OptionValue::Text(self.config.params.encode()?))
        };
        apply(&mut self.config.options, &mut *handle, id, value)?;
        let headers = OptionValue::List(self.config.headers.clone());
        apply(&mut self.config.options, &mut *handle, OptionId::HttpHeader, headers)?;

        debug!(method = %self.config.method, uri = %self.config.uri, "sending request");
        let outcome = handle.perform();
        drop(handle);

        let response = match outcome {
            Ok(response) => response,
            Err(failure) => {
                warn!(uri = %self.config.uri, error = %failure, "no response received");
                return Err(RequestError::client(failure.message));
            }
        };

        if !self.config.success.accepts(response.status) {
            warn!(uri = %self.config.uri, status = response.status, "error response");
            return Err(RequestError::server(response.status, response.body));
        }

        debug!(status = response.status, bytes = response.body.len(), "request succeeded");
        Ok(response)
    }
}

fn apply<H: TransportHandle>(
    options: &mut Options,
    handle: &mut H,
    id: OptionId,
    value: OptionValue,
) -> Result<()> {
    handle.set_option(&id, &value)?;
    debug!(option = %id, "option applied");
    options.set(id, value);
    Ok(())
}

/// Serializes the configuration only; the handle is never persisted.
impl<H: TransportHandle> Serialize for Request<H> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.config.serialize(serializer)
    }
}

impl<H: TransportHandle> fmt::Debug for Request<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("config", &self.config)
            .field("sent", &self.is_sent())
            .finish()
    }
}

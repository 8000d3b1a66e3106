//! In-memory transport for tests.
//!
//! `MockTransport` hands out handles that never touch the network. Each
//! opened handle is recorded as an `Exchange`: the URI it was bound to,
//! every option applied to it in order, whether the transfer ran and whether
//! the handle was closed. Clones share state, so a test keeps one clone to
//! inspect what a `Request` did with the other.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{RequestError, Result};
use crate::http::{split_header_line, Method, Response};
use crate::options::{OptionId, OptionValue};
use crate::transport::{TransferFailure, Transport, TransportHandle};

#[derive(Debug, Clone)]
enum Outcome {
    Respond { status: u16, body: String },
    Fail(String),
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Respond {
            status: 200,
            body: String::new(),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    outcome: Outcome,
    refuse_open: bool,
    exchanges: Vec<Exchange>,
}

/// What one handle saw during its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub uri: String,
    pub applied: Vec<(OptionId, OptionValue)>,
    pub performed: bool,
    pub closed: bool,
}

impl Exchange {
    fn last(&self, id: &OptionId) -> Option<&OptionValue> {
        self.applied.iter().rev().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    /// Verb from the last `CustomRequest` option.
    pub fn method(&self) -> Option<&str> {
        self.last(&OptionId::CustomRequest).and_then(OptionValue::as_text)
    }

    /// Last `Url` option, falling back to the URI the handle was opened with.
    pub fn target_url(&self) -> &str {
        self.last(&OptionId::Url)
            .and_then(OptionValue::as_text)
            .unwrap_or(&self.uri)
    }

    pub fn body(&self) -> Option<&str> {
        self.last(&OptionId::PostFields).and_then(OptionValue::as_text)
    }

    pub fn headers(&self) -> Vec<String> {
        self.last(&OptionId::HttpHeader)
            .and_then(OptionValue::as_list)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }
}

/// Transport that answers every transfer with a scripted outcome.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Answers every transfer with status 200 and an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(status: u16, body: impl Into<String>) -> Self {
        let transport = Self::new();
        transport.set_response(status, body);
        transport
    }

    pub fn fail(message: impl Into<String>) -> Self {
        let transport = Self::new();
        transport.set_failure(message);
        transport
    }

    pub fn set_response(&self, status: u16, body: impl Into<String>) {
        self.state.lock().outcome = Outcome::Respond {
            status,
            body: body.into(),
        };
    }

    /// Makes transfers fail without a response.
    pub fn set_failure(&self, message: impl Into<String>) {
        self.state.lock().outcome = Outcome::Fail(message.into());
    }

    /// Makes `open` fail from now on.
    pub fn refuse_open(&self) {
        self.state.lock().refuse_open = true;
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.state.lock().exchanges.clone()
    }

    /// The most recently opened handle's exchange.
    pub fn last_exchange(&self) -> Option<Exchange> {
        self.state.lock().exchanges.last().cloned()
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    fn open(&self, uri: &str) -> Result<MockHandle> {
        let mut state = self.state.lock();
        if state.refuse_open {
            return Err(RequestError::Initialization(format!(
                "mock transport refused to open {uri}"
            )));
        }
        state.exchanges.push(Exchange {
            uri: uri.to_string(),
            applied: Vec::new(),
            performed: false,
            closed: false,
        });
        Ok(MockHandle {
            state: Arc::clone(&self.state),
            index: state.exchanges.len() - 1,
        })
    }
}

/// Handle returned by `MockTransport`.
#[derive(Debug)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    index: usize,
}

impl MockHandle {
    fn with_exchange<R>(&self, f: impl FnOnce(&mut Exchange) -> R) -> R {
        let mut state = self.state.lock();
        f(&mut state.exchanges[self.index])
    }
}

/// Checks that a value has the shape the real transports expect.
fn check(id: &OptionId, value: &OptionValue) -> Result<()> {
    let ok = match id {
        OptionId::CustomRequest => match value.as_text() {
            Some(verb) => verb.parse::<Method>().is_ok(),
            None => false,
        },
        OptionId::Url | OptionId::PostFields | OptionId::Proxy | OptionId::UserAgent => {
            value.as_text().is_some()
        }
        OptionId::HttpHeader => match value.as_list() {
            Some(lines) => lines.iter().all(|line| split_header_line(line).is_some()),
            None => false,
        },
        OptionId::Timeout | OptionId::ConnectTimeout | OptionId::MaxRedirects => {
            value.as_int().is_some_and(|n| n >= 0)
        }
        OptionId::ReturnTransfer
        | OptionId::Header
        | OptionId::HeaderOut
        | OptionId::FollowLocation
        | OptionId::SslVerifyPeer => value.as_bool().is_some(),
        OptionId::Custom(_) => true,
    };
    if ok {
        Ok(())
    } else {
        Err(RequestError::invalid_option(id, format!("unexpected value {value:?}")))
    }
}

impl TransportHandle for MockHandle {
    fn set_option(&mut self, id: &OptionId, value: &OptionValue) -> Result<()> {
        check(id, value)?;
        self.with_exchange(|exchange| exchange.applied.push((id.clone(), value.clone())));
        Ok(())
    }

    fn perform(&mut self) -> std::result::Result<Response, TransferFailure> {
        let outcome = self.state.lock().outcome.clone();
        let (url, request_header) = self.with_exchange(|exchange| {
            exchange.performed = true;
            let capture = exchange
                .last(&OptionId::HeaderOut)
                .and_then(OptionValue::as_bool)
                .unwrap_or(false);
            let header = capture.then(|| {
                let mut block = format!(
                    "{} {}\r\n",
                    exchange.method().unwrap_or("GET"),
                    exchange.target_url()
                );
                for line in exchange.headers() {
                    block.push_str(&line);
                    block.push_str("\r\n");
                }
                block.push_str("\r\n");
                block
            });
            (exchange.target_url().to_string(), header)
        });

        match outcome {
            Outcome::Respond { status, body } => Ok(Response {
                status,
                body,
                url,
                request_header,
            }),
            Outcome::Fail(message) => Err(TransferFailure::new(message)),
        }
    }

    fn close(&mut self) {
        self.with_exchange(|exchange| exchange.closed = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_options_in_application_order() {
        let transport = MockTransport::new();
        let mut handle = transport.open("http://localhost/").unwrap();
        handle.set_option(&OptionId::Timeout, &OptionValue::Int(3)).unwrap();
        handle
            .set_option(&OptionId::Url, &OptionValue::Text("http://localhost/?a=1".into()))
            .unwrap();

        let exchange = transport.last_exchange().unwrap();
        assert_eq!(exchange.applied.len(), 2);
        assert_eq!(exchange.target_url(), "http://localhost/?a=1");
        assert!(!exchange.performed);
    }

    #[test]
    fn rejects_mistyped_values() {
        let transport = MockTransport::new();
        let mut handle = transport.open("http://localhost/").unwrap();
        assert!(handle
            .set_option(&OptionId::CustomRequest, &OptionValue::Text("BREW".into()))
            .is_err());
        assert!(handle.set_option(&OptionId::HttpHeader, &OptionValue::Bool(true)).is_err());
        assert!(handle.set_option(&OptionId::Timeout, &OptionValue::Int(-1)).is_err());
        assert!(handle
            .set_option(&OptionId::HttpHeader, &OptionValue::List(vec![": v".into()]))
            .is_err());
        assert!(transport.last_exchange().unwrap().applied.is_empty());
    }

    #[test]
    fn captures_request_header_when_enabled() {
        let transport = MockTransport::respond(200, "body");
        let mut handle = transport.open("http://localhost/get").unwrap();
        handle.set_option(&OptionId::HeaderOut, &OptionValue::Bool(true)).unwrap();
        handle
            .set_option(&OptionId::HttpHeader, &OptionValue::List(vec!["Accept: */*".into()]))
            .unwrap();

        let response = handle.perform().unwrap();
        assert_eq!(
            response.request_header.as_deref(),
            Some("GET http://localhost/get\r\nAccept: */*\r\n\r\n")
        );
    }

    #[test]
    fn scripted_failure_is_returned() {
        let transport = MockTransport::fail("Could not resolve host");
        let mut handle = transport.open("http://nowhere.invalid/").unwrap();
        let failure = handle.perform().unwrap_err();
        assert_eq!(failure.message, "Could not resolve host");
        handle.close();
        assert!(transport.last_exchange().unwrap().closed);
    }
}

//! Blocking transport backed by `ureq`.
//!
//! # Design
//! A `UreqHandle` is plain state until `perform`: options only update fields.
//! `perform` builds a one-off `ureq::Agent` from those fields, dispatches the
//! request and reads the whole body. Status codes are never turned into
//! errors here (`http_status_as_error(false)`); classifying them is the
//! builder's job. Redirects are followed the way ureq does by default unless
//! `FollowLocation` is switched off.

use std::io::Write;
use std::time::Duration;

use tracing::{debug, trace};
use ureq::http::{Response as HttpResponse, Uri};
use ureq::tls::TlsConfig;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, Body, RequestBuilder};

use crate::error::{RequestError, Result};
use crate::http::{split_header_line, Method, Response, FORM_CONTENT_TYPE};
use crate::options::{OptionId, OptionValue};
use crate::transport::{TransferFailure, Transport, TransportHandle};

/// Opens `UreqHandle`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for UreqTransport {
    type Handle = UreqHandle;

    fn open(&self, uri: &str) -> Result<UreqHandle> {
        uri.parse::<Uri>()
            .map_err(|e| RequestError::Initialization(format!("invalid URI {uri:?}: {e}")))?;
        trace!(uri, "opened ureq handle");
        Ok(UreqHandle::new(uri))
    }
}

/// One transfer executed through `ureq`.
#[derive(Debug)]
pub struct UreqHandle {
    url: String,
    method: Method,
    headers: Vec<String>,
    body: Option<String>,
    return_transfer: bool,
    include_header: bool,
    capture_header: bool,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    follow_location: bool,
    max_redirects: Option<u32>,
    verify_peer: bool,
    proxy: Option<String>,
    user_agent: Option<String>,
}

impl UreqHandle {
    fn new(uri: &str) -> Self {
        Self {
            url: uri.to_string(),
            method: Method::Get,
            headers: Vec::new(),
            body: None,
            return_transfer: false,
            include_header: false,
            capture_header: false,
            timeout: None,
            connect_timeout: None,
            follow_location: true,
            max_redirects: None,
            verify_peer: true,
            proxy: None,
            user_agent: None,
        }
    }

    fn redirect_limit(&self) -> Option<u32> {
        if self.follow_location {
            self.max_redirects
        } else {
            Some(0)
        }
    }

    fn agent(&self) -> std::result::Result<Agent, TransferFailure> {
        let mut config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(self.timeout)
            .timeout_connect(self.connect_timeout);
        if let Some(limit) = self.redirect_limit() {
            config = config.max_redirects(limit);
        }
        if !self.verify_peer {
            config = config.tls_config(TlsConfig::builder().disable_verification(true).build());
        }
        if let Some(proxy) = &self.proxy {
            let proxy = ureq::Proxy::new(proxy).map_err(|e| TransferFailure::new(e.to_string()))?;
            config = config.proxy(Some(proxy));
        }
        Ok(config.build().new_agent())
    }

    fn header_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> =
            self.headers.iter().filter_map(|line| split_header_line(line)).collect();
        if let Some(agent) = self.user_agent.as_deref() {
            if !pairs.iter().any(|(name, _)| name.eq_ignore_ascii_case("user-agent")) {
                pairs.push(("User-Agent", agent));
            }
        }
        pairs
    }

    fn has_header(&self, name: &str) -> bool {
        self.header_pairs()
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Request line and configured headers as they go on the wire.
    fn request_header(&self) -> String {
        let (host, target) = match self.url.parse::<Uri>() {
            Ok(uri) => (
                uri.authority().map(|a| a.to_string()).unwrap_or_default(),
                uri.path_and_query()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "/".to_string()),
            ),
            Err(_) => (String::new(), self.url.clone()),
        };
        let mut block = format!("{} {} HTTP/1.1\r\nHost: {}\r\n", self.method, target, host);
        for (name, value) in self.header_pairs() {
            block.push_str(&format!("{name}: {value}\r\n"));
        }
        block.push_str("\r\n");
        block
    }

    fn dispatch(&self, agent: &Agent) -> std::result::Result<HttpResponse<Body>, ureq::Error> {
        let url = self.url.as_str();
        match self.method {
            Method::Get => self.without_body(agent.get(url)),
            Method::Head => self.without_body(agent.head(url)),
            Method::Delete => self.without_body(agent.delete(url)),
            Method::Options => self.without_body(agent.options(url)),
            Method::Post => self.with_body(agent.post(url)),
            Method::Put => self.with_body(agent.put(url)),
            Method::Patch => self.with_body(agent.patch(url)),
        }
    }

    fn with_headers<B>(&self, mut request: RequestBuilder<B>) -> RequestBuilder<B> {
        for (name, value) in self.header_pairs() {
            request = request.header(name, value);
        }
        request
    }

    fn without_body(
        &self,
        request: RequestBuilder<WithoutBody>,
    ) -> std::result::Result<HttpResponse<Body>, ureq::Error> {
        let request = self.with_headers(request);
        match self.body.as_deref() {
            Some(body) if !body.is_empty() => self.send_form(request.force_send_body(), body),
            _ => request.call(),
        }
    }

    fn with_body(
        &self,
        request: RequestBuilder<WithBody>,
    ) -> std::result::Result<HttpResponse<Body>, ureq::Error> {
        let request = self.with_headers(request);
        match self.body.as_deref() {
            Some(body) => self.send_form(request, body),
            None => request.send_empty(),
        }
    }

    fn send_form(
        &self,
        request: RequestBuilder<WithBody>,
        body: &str,
    ) -> std::result::Result<HttpResponse<Body>, ureq::Error> {
        let request = if self.has_header("content-type") {
            request
        } else {
            request.content_type(FORM_CONTENT_TYPE)
        };
        request.send(body.as_bytes())
    }
}

fn response_head(response: &HttpResponse<Body>) -> String {
    let status = response.status();
    let mut head = format!(
        "{:?} {} {}\r\n",
        response.version(),
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    for (name, value) in response.headers() {
        head.push_str(&format!("{}: {}\r\n", name, value.to_str().unwrap_or("")));
    }
    head.push_str("\r\n");
    head
}

fn text<'a>(id: &OptionId, value: &'a OptionValue) -> Result<&'a str> {
    value
        .as_text()
        .ok_or_else(|| RequestError::invalid_option(id, "expected text"))
}

fn flag(id: &OptionId, value: &OptionValue) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| RequestError::invalid_option(id, "expected a boolean"))
}

fn count(id: &OptionId, value: &OptionValue) -> Result<u32> {
    value
        .as_int()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| RequestError::invalid_option(id, "expected a non-negative integer"))
}

/// Zero seconds means no timeout.
fn seconds(id: &OptionId, value: &OptionValue) -> Result<Option<Duration>> {
    let secs = count(id, value)?;
    Ok((secs > 0).then(|| Duration::from_secs(u64::from(secs))))
}

impl TransportHandle for UreqHandle {
    fn set_option(&mut self, id: &OptionId, value: &OptionValue) -> Result<()> {
        match id {
            OptionId::CustomRequest => {
                self.method = text(id, value)?
                    .parse()
                    .map_err(|_| RequestError::invalid_option(id, "unsupported HTTP method"))?;
            }
            OptionId::Url => {
                let url = text(id, value)?;
                url.parse::<Uri>()
                    .map_err(|e| RequestError::invalid_option(id, e.to_string()))?;
                self.url = url.to_string();
            }
            OptionId::PostFields => self.body = Some(text(id, value)?.to_string()),
            OptionId::HttpHeader => {
                let lines = value
                    .as_list()
                    .ok_or_else(|| RequestError::invalid_option(id, "expected a list of header lines"))?;
                if let Some(bad) = lines.iter().find(|line| split_header_line(line).is_none()) {
                    return Err(RequestError::invalid_option(
                        id,
                        format!("malformed header line: {bad:?}"),
                    ));
                }
                self.headers = lines.to_vec();
            }
            OptionId::ReturnTransfer => self.return_transfer = flag(id, value)?,
            OptionId::Header => self.include_header = flag(id, value)?,
            OptionId::HeaderOut => self.capture_header = flag(id, value)?,
            OptionId::Timeout => self.timeout = seconds(id, value)?,
            OptionId::ConnectTimeout => self.connect_timeout = seconds(id, value)?,
            OptionId::FollowLocation => self.follow_location = flag(id, value)?,
            OptionId::MaxRedirects => self.max_redirects = Some(count(id, value)?),
            OptionId::SslVerifyPeer => self.verify_peer = flag(id, value)?,
            OptionId::Proxy => {
                let proxy = text(id, value)?;
                ureq::Proxy::new(proxy).map_err(|e| RequestError::invalid_option(id, e.to_string()))?;
                self.proxy = Some(proxy.to_string());
            }
            OptionId::UserAgent => self.user_agent = Some(text(id, value)?.to_string()),
            OptionId::Custom(_) => {
                return Err(RequestError::invalid_option(
                    id,
                    "not recognized by the ureq transport",
                ))
            }
        }
        Ok(())
    }

    fn perform(&mut self) -> std::result::Result<Response, TransferFailure> {
        let agent = self.agent()?;
        debug!(method = %self.method, url = %self.url, "performing transfer");
        let request_header = self.capture_header.then(|| self.request_header());

        let mut response = self
            .dispatch(&agent)
            .map_err(|e| TransferFailure::new(e.to_string()))?;
        let status = response.status().as_u16();
        let mut body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransferFailure::new(e.to_string()))?;

        if self.include_header {
            body = format!("{}{}", response_head(&response), body);
        }
        if !self.return_transfer {
            std::io::stdout()
                .write_all(body.as_bytes())
                .map_err(|e| TransferFailure::new(e.to_string()))?;
            body.clear();
        }

        Ok(Response {
            status,
            body,
            url: self.url.clone(),
            request_header,
        })
    }

    fn close(&mut self) {
        self.body = None;
        self.headers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> UreqHandle {
        UreqTransport.open("http://localhost:3000/get").unwrap()
    }

    #[test]
    fn open_rejects_unparseable_uri() {
        let err = UreqTransport.open("http://bad host/").unwrap_err();
        assert!(matches!(err, RequestError::Initialization(_)));
    }

    #[test]
    fn custom_options_are_rejected() {
        let mut handle = handle();
        let err = handle
            .set_option(&OptionId::Custom("tcp_nodelay".into()), &OptionValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, RequestError::InvalidOption { .. }));
    }

    #[test]
    fn values_of_the_wrong_shape_are_rejected() {
        let mut handle = handle();
        assert!(handle.set_option(&OptionId::Timeout, &OptionValue::Text("5".into())).is_err());
        assert!(handle.set_option(&OptionId::Timeout, &OptionValue::Int(-5)).is_err());
        assert!(handle
            .set_option(&OptionId::CustomRequest, &OptionValue::Text("BREW".into()))
            .is_err());
        assert!(handle
            .set_option(&OptionId::HttpHeader, &OptionValue::List(vec!["no colon".into()]))
            .is_err());
        assert!(handle
            .set_option(&OptionId::HttpHeader, &OptionValue::List(vec![": v".into()]))
            .is_err());
    }

    #[test]
    fn timeout_zero_means_unlimited() {
        let mut handle = handle();
        handle.set_option(&OptionId::Timeout, &OptionValue::Int(7)).unwrap();
        assert_eq!(handle.timeout, Some(Duration::from_secs(7)));
        handle.set_option(&OptionId::Timeout, &OptionValue::Int(0)).unwrap();
        assert_eq!(handle.timeout, None);
    }

    #[test]
    fn follow_location_off_disables_redirects() {
        let mut handle = handle();
        assert_eq!(handle.redirect_limit(), None);
        handle.set_option(&OptionId::MaxRedirects, &OptionValue::Int(3)).unwrap();
        assert_eq!(handle.redirect_limit(), Some(3));
        handle.set_option(&OptionId::FollowLocation, &OptionValue::Bool(false)).unwrap();
        assert_eq!(handle.redirect_limit(), Some(0));
    }

    #[test]
    fn request_header_lists_configured_headers() {
        let mut handle = handle();
        handle
            .set_option(&OptionId::CustomRequest, &OptionValue::Text("DELETE".into()))
            .unwrap();
        handle
            .set_option(&OptionId::Url, &OptionValue::Text("http://localhost:3000/get?a=1".into()))
            .unwrap();
        handle
            .set_option(&OptionId::HttpHeader, &OptionValue::List(vec!["Accept: text/plain".into()]))
            .unwrap();
        handle
            .set_option(&OptionId::UserAgent, &OptionValue::Text("request-core-test/1.0".into()))
            .unwrap();

        assert_eq!(
            handle.request_header(),
            "DELETE /get?a=1 HTTP/1.1\r\nHost: localhost:3000\r\nAccept: text/plain\r\nUser-Agent: request-core-test/1.0\r\n\r\n"
        );
    }

    #[test]
    fn configured_user_agent_header_wins() {
        let mut handle = handle();
        handle
            .set_option(&OptionId::HttpHeader, &OptionValue::List(vec!["User-agent: mine".into()]))
            .unwrap();
        handle
            .set_option(&OptionId::UserAgent, &OptionValue::Text("default".into()))
            .unwrap();
        assert_eq!(handle.header_pairs(), vec![("User-agent", "mine")]);
        assert!(handle.has_header("user-agent"));
    }
}

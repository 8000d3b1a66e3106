//! Synchronous one-shot HTTP request builder.
//!
//! # Overview
//! A `Request` is bound to one URI and one transport handle. Configure it
//! with parameters, headers, a method and transport options, then `send` it
//! once to get the raw response body, or a `RequestError` saying either that
//! no response arrived (`Client`) or that the response failed the success
//! check (`Server`).
//!
//! # Design
//! - Transports sit behind the `Transport`/`TransportHandle` traits.
//!   `UreqTransport` does real I/O; `MockTransport` records what it is asked
//!   to do and answers with a scripted outcome.
//! - GET requests carry parameters in the query string, every other method
//!   sends them as a form-encoded body.
//! - Success means status 200 exactly unless the request opts into
//!   `SuccessPolicy::Any2xx`. Note that 201, 204 and redirects that are not
//!   followed are errors under the default.
//! - A request serializes to its `RequestConfig` only. Restoring opens a new
//!   handle and replays the recorded options in order.

pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod options;
pub mod request;
pub mod transport;

pub use agent::{UreqHandle, UreqTransport};
pub use config::{RequestConfig, SuccessPolicy};
pub use error::{RequestError, Result};
pub use http::{Method, Params, Response};
pub use mock::{Exchange, MockTransport};
pub use options::{OptionId, OptionValue, Options};
pub use request::Request;
pub use transport::{TransferFailure, Transport, TransportHandle};

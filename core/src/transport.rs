//! Transport seam between the builder and the library that moves bytes.
//!
//! # Design
//! A `Transport` opens handles; a `TransportHandle` is bound to one URI,
//! accepts options one at a time and performs exactly one transfer. The
//! builder wraps its handle in `HandleGuard`, which closes it on drop, so the
//! handle is released on every exit path of a send without explicit close
//! calls in each branch.

use std::ops::{Deref, DerefMut};

use thiserror::Error;
use tracing::trace;

use crate::error::Result;
use crate::http::Response;
use crate::options::{OptionId, OptionValue};

/// Opens transport handles.
pub trait Transport {
    type Handle: TransportHandle;

    /// Opens a handle bound to `uri`. Failure maps to
    /// `RequestError::Initialization`.
    fn open(&self, uri: &str) -> Result<Self::Handle>;
}

/// One exclusively-owned transfer in progress.
pub trait TransportHandle {
    /// Applies a single option immediately. Unknown ids or values of the
    /// wrong shape are rejected with `RequestError::InvalidOption`.
    fn set_option(&mut self, id: &OptionId, value: &OptionValue) -> Result<()>;

    /// Runs the transfer. Any received response is `Ok`, whatever its
    /// status; `Err` means nothing was received.
    fn perform(&mut self) -> std::result::Result<Response, TransferFailure>;

    /// Releases the handle's resources. Called once, by `HandleGuard`.
    fn close(&mut self);
}

/// A transfer that produced no response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransferFailure {
    pub message: String,
}

impl TransferFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Closes the wrapped handle when dropped.
pub(crate) struct HandleGuard<H: TransportHandle>(H);

impl<H: TransportHandle> HandleGuard<H> {
    pub(crate) fn new(handle: H) -> Self {
        Self(handle)
    }
}

impl<H: TransportHandle> Deref for HandleGuard<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.0
    }
}

impl<H: TransportHandle> DerefMut for HandleGuard<H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut self.0
    }
}

impl<H: TransportHandle> Drop for HandleGuard<H> {
    fn drop(&mut self) {
        self.0.close();
        trace!("transport handle closed");
    }
}

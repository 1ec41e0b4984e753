// SPDX-License-Identifier: Apache-2.0
//! Cancellation tokens for listener subscriptions.
//!
//! [`CancellationSource`] is the Rust-side equivalent of an `AbortController`:
//! every listener registered with a [`CancellationToken`] from the same source
//! is revoked the moment the source is cancelled, including listeners that
//! are still queued in the dispatch currently running.
//!
//! Everything runs on the page's event loop, so the state is a shared
//! `Rc<Cell<bool>>` rather than an atomic.
//!
//! # Example
//!
//! ```
//! use flowpatch_core::cancellation::CancellationSource;
//!
//! let source = CancellationSource::new();
//! let click = source.token();
//! let mousedown = source.token();
//!
//! source.cancel();
//! assert!(click.is_cancelled() && mousedown.is_cancelled());
//! ```

#![forbid(unsafe_code)]

use std::cell::Cell;
use std::rc::Rc;

/// A cloneable view of a cancellation source.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Rc<Cell<bool>>,
}

/// The control handle that triggers cancellation.
///
/// Dropping the source does **not** cancel the token; call
/// [`cancel`](Self::cancel) explicitly.
#[derive(Debug)]
pub struct CancellationSource {
    inner: Rc<Cell<bool>>,
}

impl CancellationSource {
    /// Create a new cancellation source with an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Cell::new(false)),
        }
    }

    /// Obtain a token that observes this source's state.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.set(true);
    }

    /// Check whether cancellation has already been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.get()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Returns `true` if cancellation has been requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.get()
    }
}

//! Lazy token streams.
//!
//! Streaming calls return a [`TokenStream`]: a pull-based sequence of text
//! fragments. The only blocking point is the caller's own pull; between
//! pulls no background work proceeds and nothing is buffered ahead of the
//! consumer. Dropping the stream releases the underlying transport or
//! decode resources. A fragment-level failure is delivered as an `Err`
//! item, after which the stream is finished.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::Stream;
use futures_util::StreamExt;

use crate::error::VlmError;

/// Pull-based sequence of generated text fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, VlmError>> + Send>>;

/// Drain a token stream into the concatenation of its fragments.
///
/// Fails with the stream's error if any pull fails; no partial text is
/// returned on the error path.
pub async fn collect_text(mut stream: TokenStream) -> Result<String, VlmError> {
    let mut out = String::new();
    while let Some(fragment) = stream.next().await {
        out.push_str(&fragment?);
    }
    Ok(out)
}

/// A handle that can be used to request cancellation of a token stream.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// Request cancellation. The wrapped stream stops at its next pull;
    /// dropping it then closes the underlying connection so the service
    /// stops generating tokens.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Make a token stream cancellable and return its cancel handle.
pub fn make_cancellable(stream: TokenStream) -> (TokenStream, CancelHandle) {
    let flag = Arc::new(AtomicBool::new(false));
    let handle = CancelHandle::new(flag.clone());
    let mut inner = stream;
    let wrapped = async_stream::stream! {
        while let Some(item) = inner.next().await {
            if flag.load(Ordering::SeqCst) {
                break;
            }
            yield item;
        }
    };
    (Box::pin(wrapped), handle)
}

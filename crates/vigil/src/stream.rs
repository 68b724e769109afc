//! Cancellable outcome stream.

use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use vigil_core::GenerationOutcome;
use vigil_error::{RetryableError, VigilError, VigilErrorKind};

/// Outcomes of one submitted request.
///
/// Yields zero or more `Loading` outcomes followed by exactly one terminal
/// outcome. Dropping the stream cancels the request.
#[derive(Debug)]
pub struct GenerationStream {
    inner: ReceiverStream<GenerationOutcome>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl GenerationStream {
    pub(crate) fn new(rx: mpsc::Receiver<GenerationOutcome>, cancel: CancellationToken) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            _guard: cancel.clone().drop_guard(),
            cancel,
        }
    }

    /// Cancel the request. The stream still ends with a terminal outcome.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drain the stream and return its terminal outcome.
    pub async fn final_outcome(mut self) -> GenerationOutcome {
        while let Some(outcome) = self.next().await {
            if outcome.is_terminal() {
                return outcome;
            }
        }
        let error = VigilError::new(VigilErrorKind::Cancelled);
        GenerationOutcome::Error {
            message: error.user_message(),
            category: error.category(),
        }
    }
}

impl Stream for GenerationStream {
    type Item = GenerationOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

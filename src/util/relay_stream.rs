use std::{
  future::Future,
  pin::Pin,
  task::{Context, Poll},
  time::Duration,
};

use bytes::Bytes;
use futures::Stream;
use tokio::time::Sleep;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Forwards an upstream byte stream to a response body. Upstream failures
/// come out as `Error::StreamCopy` and end the stream.
pub struct RelayStream<T> {
  stream: T,
  idle_timeout: Option<Duration>,
  idle: Option<Pin<Box<Sleep>>>,
  copied: u64,
  finished: bool,
}

impl<T> RelayStream<T> {
  pub fn new(stream: T) -> Self {
    RelayStream {
      stream,
      idle_timeout: None,
      idle: None,
      copied: 0,
      finished: false,
    }
  }

  pub fn idle_timeout(self, timeout: Option<Duration>) -> Self {
    RelayStream {
      idle_timeout: timeout,
      ..self
    }
  }

  fn fail(&mut self, err: Error) -> Poll<Option<Result<Bytes>>> {
    self.finished = true;
    let err = match err {
      Error::StreamCopy(_) => err,
      other => Error::StreamCopy(other.to_string()),
    };
    warn!("relay aborted after {} bytes: {err}", self.copied);
    Poll::Ready(Some(Err(err)))
  }
}

impl<T> Stream for RelayStream<T>
where
  T: Stream<Item = Result<Bytes>> + Unpin,
{
  type Item = Result<Bytes>;

  fn poll_next(
    mut self: Pin<&mut Self>,
    cx: &mut Context<'_>,
  ) -> Poll<Option<Self::Item>> {
    let this = &mut *self;
    if this.finished {
      return Poll::Ready(None);
    }

    match Pin::new(&mut this.stream).poll_next(cx) {
      Poll::Ready(Some(Ok(bytes))) => {
        this.copied += bytes.len() as u64;
        this.idle = None;
        Poll::Ready(Some(Ok(bytes)))
      }
      Poll::Ready(Some(Err(err))) => this.fail(err),
      Poll::Ready(None) => {
        this.finished = true;
        debug!("relay finished after {} bytes", this.copied);
        Poll::Ready(None)
      }
      Poll::Pending => {
        let Some(timeout) = this.idle_timeout else {
          return Poll::Pending;
        };

        let idle = this
          .idle
          .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
        match idle.as_mut().poll(cx) {
          Poll::Ready(()) => this.fail(Error::StreamCopy(format!(
            "upstream idle for {}s",
            timeout.as_secs_f32()
          ))),
          Poll::Pending => Poll::Pending,
        }
      }
    }
  }
}

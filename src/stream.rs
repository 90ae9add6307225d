//! Server-sent-event decoding into completion fragments
//!
//! [`FragmentStream`] is pull driven: each poll reads at most as far as
//! the next event, nothing is buffered ahead of the caller. Its
//! lifecycle is an explicit state machine:
//!
//! ```text
//! Open -> Streaming -> ErrorSeen -> Closing -> Closed
//!           \_____________________/
//! ```
//!
//! An error event does not end the stream early. Every fragment up to
//! and including it is delivered, and the connection is dropped once
//! the server closes the event stream.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::{Event, Eventsource};
use futures_util::stream::{Stream, StreamExt};
use serde::Serialize;
use log::{debug, trace, warn};

use crate::error::Error;
use crate::providers::ERROR_EVENT;

type EventSource
  = Pin<Box<dyn Stream<Item = Result<Event, Error>> + Send>>;

/// Wire shape of a fragment's text
#[derive(Serialize)]
struct FragmentText<'a>
{   event: &'a str
  , data: &'a str
}

/// One streamed unit of output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionFragment
{   pub event_kind: String
  , pub raw_event_data: String
  , text: String
}

impl CompletionFragment
{   pub fn new(
      event_kind: impl Into<String>
    , raw_event_data: impl Into<String>
    ) -> Result<Self, Error>
    {   let event_kind = event_kind.into();
        let raw_event_data = raw_event_data.into();
        let text = serde_json::to_string(&FragmentText
        {   event: &event_kind
          , data: &raw_event_data
        }).map_err(|e| Error::ParseError(e.to_string()))?;
        Ok(CompletionFragment
        {   event_kind
          , raw_event_data
          , text
        })
    }

    /// `{"event": <kind>, "data": <data>}` as JSON text
    pub fn text(&self) -> &str
    {   &self.text
    }

    pub fn is_error(&self) -> bool
    {   self.event_kind == ERROR_EVENT
    }
}

/// Lifecycle of a fragment stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState
{   /// Connected, nothing read yet
    Open
  , /// At least one event delivered
    Streaming
  , /// An error event was delivered, teardown pending
    ErrorSeen
  , /// Releasing the connection
    Closing
  , /// Connection released, stream exhausted
    Closed
}

/// Lazy, forward-only sequence of completion fragments
pub struct FragmentStream
{   events: Option<EventSource>
  , state: StreamState
  , error_seen: bool
  , delivered: usize
}

impl FragmentStream
{   /// Decode a streaming HTTP response
    pub fn from_response(response: reqwest::Response) -> Self
    {   FragmentStream::from_byte_stream(response.bytes_stream())
    }

    /// Decode any chunked byte stream carrying SSE text
    pub fn from_byte_stream<S, B, E>(bytes: S) -> Self
    where
      S: Stream<Item = Result<B, E>> + Send + 'static
    , B: AsRef<[u8]> + Send + 'static
    , E: Display + Send + 'static
    {   let events = bytes
          .eventsource()
          .map(|event| event.map_err(|e| Error::StreamError(e.to_string())));
        FragmentStream
        {   events: Some(Box::pin(events))
          , state: StreamState::Open
          , error_seen: false
          , delivered: 0
        }
    }

    pub fn state(&self) -> StreamState
    {   self.state
    }

    /// Whether an error event has been delivered so far
    pub fn error_seen(&self) -> bool
    {   self.error_seen
    }

    /// Number of fragments handed out so far
    pub fn delivered(&self) -> usize
    {   self.delivered
    }

    /// Drop the connection now; later polls yield nothing
    pub fn close(&mut self)
    {   if self.state == StreamState::Closed
        {   return;
        }
        self.state = StreamState::Closing;
        if self.events.take().is_some()
        {   debug!(
              "Closing event stream after {} fragments (error seen: {})"
            , self.delivered
            , self.error_seen
            );
        }
        self.state = StreamState::Closed;
    }

    fn on_event(&mut self, event: Event) -> Result<CompletionFragment, Error>
    {   trace!("SSE event `{}` ({} bytes)", event.event, event.data.len());
        let fragment = CompletionFragment::new(event.event, event.data)?;
        if fragment.is_error()
        {   warn!("Error event received: {}", fragment.raw_event_data);
            self.error_seen = true;
            self.state = StreamState::ErrorSeen;
        } else if self.state == StreamState::Open
        {   self.state = StreamState::Streaming;
        }
        self.delivered += 1;
        Ok(fragment)
    }
}

impl Stream for FragmentStream
{   type Item = Result<CompletionFragment, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>)
      -> Poll<Option<Self::Item>>
    {   let this = self.get_mut();
        let events = match this.events.as_mut()
        {   Some(events) => events
          , None => return Poll::Ready(None)
        };

        match events.as_mut().poll_next(cx)
        {   Poll::Pending => Poll::Pending
          , Poll::Ready(Some(Ok(event))) => {
              Poll::Ready(Some(this.on_event(event)))
            }
          , Poll::Ready(Some(Err(e))) => {
              warn!("Event stream failed: {}", e);
              this.close();
              Poll::Ready(Some(Err(e)))
            }
          , Poll::Ready(None) => {
              this.close();
              Poll::Ready(None)
            }
        }
    }
}

impl std::fmt::Debug for FragmentStream
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("FragmentStream")
          .field("state", &self.state)
          .field("error_seen", &self.error_seen)
          .field("delivered", &self.delivered)
          .finish()
    }
}

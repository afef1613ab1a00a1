//! Feedback sinks for progress reporting and cooperative cancellation.
//!
//! The runtime and the algorithms it executes report through a [`Feedback`]
//! object. Cancellation is cooperative: the runtime checks the flag between
//! nodes and well-behaved algorithms poll it inside their own loops.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Messages emitted through a feedback sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeedbackEvent {
  Info(String),
  DebugInfo(String),
  ProgressText(String),
  Progress(f64),
}

/// Sink for progress and log messages, plus the cancellation query.
pub trait Feedback: Send + Sync {
  fn push_info(&self, message: &str);

  fn push_debug_info(&self, message: &str);

  fn set_progress_text(&self, message: &str);

  /// Percentage in `[0, 100]`.
  fn set_progress(&self, _percent: f64) {}

  fn is_canceled(&self) -> bool;
}

/// A feedback sink that discards everything and is never cancelled.
#[derive(Debug, Clone, Default)]
pub struct NoopFeedback;

impl Feedback for NoopFeedback {
  fn push_info(&self, _message: &str) {}

  fn push_debug_info(&self, _message: &str) {}

  fn set_progress_text(&self, _message: &str) {}

  fn is_canceled(&self) -> bool {
    false
  }
}

/// Forwards feedback to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingFeedback {
  cancel: CancellationToken,
}

impl TracingFeedback {
  pub fn new(cancel: CancellationToken) -> Self {
    Self { cancel }
  }

  pub fn cancel_token(&self) -> &CancellationToken {
    &self.cancel
  }
}

impl Feedback for TracingFeedback {
  fn push_info(&self, message: &str) {
    info!(target: "modeler::feedback", "{}", message);
  }

  fn push_debug_info(&self, message: &str) {
    debug!(target: "modeler::feedback", "{}", message);
  }

  fn set_progress_text(&self, message: &str) {
    info!(target: "modeler::feedback", progress = true, "{}", message);
  }

  fn set_progress(&self, percent: f64) {
    debug!(target: "modeler::feedback", percent, "progress");
  }

  fn is_canceled(&self) -> bool {
    self.cancel.is_cancelled()
  }
}

/// Sends feedback events to an unbounded channel.
///
/// Useful when events need to be consumed elsewhere (a UI, a log file, a
/// test assertion).
#[derive(Debug, Clone)]
pub struct ChannelFeedback {
  sender: mpsc::UnboundedSender<FeedbackEvent>,
  cancel: CancellationToken,
}

impl ChannelFeedback {
  pub fn new(sender: mpsc::UnboundedSender<FeedbackEvent>, cancel: CancellationToken) -> Self {
    Self { sender, cancel }
  }

  fn send(&self, event: FeedbackEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

impl Feedback for ChannelFeedback {
  fn push_info(&self, message: &str) {
    self.send(FeedbackEvent::Info(message.to_string()));
  }

  fn push_debug_info(&self, message: &str) {
    self.send(FeedbackEvent::DebugInfo(message.to_string()));
  }

  fn set_progress_text(&self, message: &str) {
    self.send(FeedbackEvent::ProgressText(message.to_string()));
  }

  fn set_progress(&self, percent: f64) {
    self.send(FeedbackEvent::Progress(percent));
  }

  fn is_canceled(&self) -> bool {
    self.cancel.is_cancelled()
  }
}

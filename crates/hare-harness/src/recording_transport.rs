//! Recording Transport for Testing
//!
//! Records every call made through `Transport` in order. Private deliveries
//! can be scripted to fail per participant, delayed to make the fan-out
//! observable, and the peak number of concurrent deliveries is tracked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hare_core::{
    ChatId, Clock, DeliveryFailure, HareError, HareResult, MessageId, MessageRef, Participant,
    ParticipantId, Recipient, RenderedState, Transport,
};
use tracing::debug;

// ----------------------------------------------------------------------------
// Recorded Calls
// ----------------------------------------------------------------------------

/// One call made through the transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Posted {
        message: MessageRef,
        state: RenderedState,
    },
    Edited {
        message: MessageRef,
        state: RenderedState,
    },
    Deactivated(MessageRef),
    Private {
        to: ParticipantId,
        payload: String,
        result: Result<(), DeliveryFailure>,
    },
    Notified {
        recipient: Recipient,
        text: String,
    },
}

// ----------------------------------------------------------------------------
// Recording Transport
// ----------------------------------------------------------------------------

/// In-memory transport that records what the game did
pub struct RecordingTransport {
    clock: Arc<dyn Clock>,
    calls: Mutex<Vec<TransportCall>>,
    failures: Mutex<HashMap<ParticipantId, DeliveryFailure>>,
    next_message_id: AtomicI64,
    send_latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_posts: AtomicBool,
}

impl RecordingTransport {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            next_message_id: AtomicI64::new(1),
            send_latency: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fail_posts: AtomicBool::new(false),
        }
    }

    /// Delay every private delivery by `latency`
    pub fn with_send_latency(mut self, latency: Duration) -> Self {
        self.send_latency = Some(latency);
        self
    }

    /// Make every private delivery to `participant` fail with `failure`
    pub fn fail_delivery(&self, participant: ParticipantId, failure: DeliveryFailure) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(participant, failure);
    }

    pub fn clear_failure(&self, participant: ParticipantId) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&participant);
    }

    /// Make posting interactive messages and notifications fail
    pub fn set_fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn posted(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Posted { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<(MessageRef, RenderedState)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Edited { message, state } => Some((message, state)),
                _ => None,
            })
            .collect()
    }

    pub fn deactivated(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Deactivated(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Private sends as (recipient, payload, outcome)
    pub fn private_sends(&self) -> Vec<(ParticipantId, String, Result<(), DeliveryFailure>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Private {
                    to,
                    payload,
                    result,
                } => Some((to, payload, result)),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<(Recipient, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Notified { recipient, text } => Some((recipient, text)),
                _ => None,
            })
            .collect()
    }

    /// Notifications posted to `chat`, in order
    pub fn chat_notifications(&self, chat: ChatId) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter_map(|(recipient, text)| (recipient == Recipient::Chat(chat)).then_some(text))
            .collect()
    }

    /// Highest number of private deliveries observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: TransportCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_interactive(&self, chat: ChatId, state: &RenderedState) -> HareResult<MessageRef> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(HareError::transport("post rejected"));
        }
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        let message = MessageRef::new(chat, MessageId::new(id), self.clock.now());
        self.record(TransportCall::Posted {
            message: message.clone(),
            state: state.clone(),
        });
        Ok(message)
    }

    async fn edit_interactive(&self, message: &MessageRef, state: &RenderedState) -> HareResult<()> {
        self.record(TransportCall::Edited {
            message: message.clone(),
            state: state.clone(),
        });
        Ok(())
    }

    async fn deactivate_controls(&self, message: &MessageRef) -> HareResult<()> {
        self.record(TransportCall::Deactivated(message.clone()));
        Ok(())
    }

    async fn send_private(&self, participant: &Participant, payload: &str) -> Result<(), DeliveryFailure> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.send_latency {
            tokio::time::sleep(latency).await;
        }

        let result = match self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&participant.id)
        {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        };
        debug!(to = %participant.id, ok = result.is_ok(), "recorded private send");
        self.record(TransportCall::Private {
            to: participant.id,
            payload: payload.to_string(),
            result: result.clone(),
        });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn notify(&self, recipient: Recipient, text: &str) -> HareResult<()> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(HareError::transport("notification rejected"));
        }
        self.record(TransportCall::Notified {
            recipient,
            text: text.to_string(),
        });
        Ok(())
    }
}

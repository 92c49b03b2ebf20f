// src/services/notifier.rs

//! Per-event delivery to the push gateway.

use std::fmt;
use std::sync::Arc;

use crate::models::{ChangeEvent, MessageId, NotifierConfig, PushMessage};
use crate::services::gateway::PushGateway;
use crate::services::retry::RetryPolicy;
use crate::storage::{AuditEntry, AuditOutcome, AuditSink};

/// Terminal result of delivering one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The gateway accepted the message.
    Delivered {
        message_id: Option<MessageId>,
        attempts: u32,
    },
    /// The gateway answered with an application error. Never retried.
    Rejected {
        error: String,
        message_id: Option<MessageId>,
        attempts: u32,
    },
    /// Every attempt failed at the transport level.
    Exhausted { attempts: u32, last_error: String },
    /// The message could not be built.
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts, .. }
            | Self::Rejected { attempts, .. }
            | Self::Exhausted { attempts, .. } => *attempts,
            Self::Failed { .. } => 0,
        }
    }

    fn audit_outcome(&self) -> AuditOutcome {
        match self {
            Self::Delivered { .. } => AuditOutcome::Delivered,
            Self::Rejected { .. } => AuditOutcome::Rejected,
            Self::Exhausted { .. } => AuditOutcome::Exhausted,
            Self::Failed { .. } => AuditOutcome::Failed,
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { message_id, attempts } => match message_id {
                Some(id) => write!(f, "delivered as {id} after {attempts} attempt(s)"),
                None => write!(f, "delivered after {attempts} attempt(s)"),
            },
            Self::Rejected { error, .. } => write!(f, "rejected: {error}"),
            Self::Exhausted {
                attempts,
                last_error,
            } => write!(f, "gave up after {attempts} attempts: {last_error}"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Sends one message per event, retrying transport failures.
pub struct Notifier {
    gateway: Arc<dyn PushGateway>,
    audit: Arc<dyn AuditSink>,
    policy: RetryPolicy,
    dry_run: bool,
}

impl Notifier {
    pub fn new(
        gateway: Arc<dyn PushGateway>,
        audit: Arc<dyn AuditSink>,
        policy: RetryPolicy,
        dry_run: bool,
    ) -> Self {
        Self {
            gateway,
            audit,
            policy,
            dry_run,
        }
    }

    pub fn from_config(
        config: &NotifierConfig,
        gateway: Arc<dyn PushGateway>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::new(gateway, audit, RetryPolicy::from_config(config), config.dry_run)
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver an event and report the outcome to the audit sink.
    pub async fn deliver(&self, event: &ChangeEvent) -> DeliveryOutcome {
        let outcome = match PushMessage::for_event(event, self.dry_run) {
            Ok(message) => self.send_with_retry(&message).await,
            Err(e) => DeliveryOutcome::Failed {
                reason: e.to_string(),
            },
        };

        match &outcome {
            DeliveryOutcome::Delivered { .. } => log::info!("{}: {}", event.topic, outcome),
            _ => log::warn!("{}: {}", event.topic, outcome),
        }
        self.audit(event, &outcome);
        outcome
    }

    async fn send_with_retry(&self, message: &PushMessage) -> DeliveryOutcome {
        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.gateway.send(message).await {
                Ok(response) => {
                    return match response.application_error() {
                        Some(error) => DeliveryOutcome::Rejected {
                            error: error.to_string(),
                            message_id: response.message_id,
                            attempts: attempt,
                        },
                        None => DeliveryOutcome::Delivered {
                            message_id: response.message_id,
                            attempts: attempt,
                        },
                    };
                }
                Err(e) => {
                    log::debug!(
                        "{}: attempt {}/{} failed: {}",
                        message.topic(),
                        attempt,
                        max_attempts,
                        e
                    );
                    last_error = e.to_string();
                }
            }
        }

        DeliveryOutcome::Exhausted {
            attempts: max_attempts,
            last_error,
        }
    }

    fn audit(&self, event: &ChangeEvent, outcome: &DeliveryOutcome) {
        let mut entry = AuditEntry::for_event(
            event,
            self.dry_run,
            outcome.audit_outcome(),
            outcome.attempts(),
        );
        entry = match outcome {
            DeliveryOutcome::Delivered { message_id, .. } => entry.with_message_id(message_id.as_ref()),
            DeliveryOutcome::Rejected {
                error, message_id, ..
            } => entry.with_message_id(message_id.as_ref()).with_error(error.as_str()),
            DeliveryOutcome::Exhausted { last_error, .. } => entry.with_error(last_error.as_str()),
            DeliveryOutcome::Failed { reason } => entry.with_error(reason.as_str()),
        };

        if let Err(e) = self.audit.record(entry) {
            log::debug!("{}: audit entry dropped: {}", event.topic, e);
        }
    }
}

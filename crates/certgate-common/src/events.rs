//! Issuer events
//!
//! Setup announces a successful verification as a Kubernetes Event on the
//! issuer, so it shows up in `kubectl describe issuer`. Publishing never
//! fails the caller: a rejected event is logged and dropped.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{EventType, Recorder, Reporter};
use kube::Client;
use parking_lot::Mutex;
use tracing::warn;

/// Env var naming the controller pod, reported as the event instance
pub const ENV_POD_NAME: &str = "POD_NAME";

/// Sink for issuer events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event about `resource_ref`
    ///
    /// `reason` and `action` are short machine-readable words (see
    /// [`reasons`] and [`actions`]); `note` is the human-readable text.
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Publishes through the API server with a kube `Recorder`
pub struct KubeEventPublisher {
    recorder: Recorder,
    controller_name: String,
}

impl KubeEventPublisher {
    /// Report events as `controller_name`, tagged with this pod's name
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var(ENV_POD_NAME).ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
            controller_name: controller_name.to_string(),
        }
    }

    /// Reporting controller shown on published events
    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = kube::runtime::events::Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(
                reason,
                action,
                error = %e,
                "Dropping issuer event the API server rejected"
            );
        }
    }
}

/// Discards every event
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Keeps events in memory as `"<Type> <Reason> <note>"` lines
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<String>>,
}

impl RecordingEventPublisher {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far, oldest first
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        let type_ = match type_ {
            EventType::Normal => "Normal",
            EventType::Warning => "Warning",
        };
        let line = match note {
            Some(note) => format!("{type_} {reason} {note}"),
            None => format!("{type_} {reason}"),
        };
        self.events.lock().push(line);
    }
}

/// Event reasons
pub mod reasons {
    /// Issuer was verified against its backend
    pub const READY: &str = "Ready";
}

/// Event actions
pub mod actions {
    /// Issuer setup/readiness verification
    pub const SETUP: &str = "Setup";
}

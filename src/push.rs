//! Background push-notification worker.
//!
//! The messaging SDK credentials are not compiled in: the page posts an
//! `init` message to the worker at runtime, and push messages arriving
//! before that are dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StorefrontError;

/// Messaging SDK parameters posted into the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushInitParams {
    pub api_key: String,
    pub project_id: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    #[serde(default)]
    pub vapid_key: Option<String>,
}

/// Message posted to the worker.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WorkerMessage {
    Init(PushInitParams),
    Push(Value),
}

/// OS-level notification to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    /// Path opened when the notification is clicked.
    pub click_path: String,
    /// Notifications sharing a tag replace each other.
    pub tag: Option<String>,
}

/// Displays notifications on the host platform.
pub trait NotificationSink {
    fn show(&self, notification: &Notification);
}

#[derive(Debug, Clone)]
pub struct PushWorker {
    params: Option<PushInitParams>,
    default_icon: String,
}

impl PushWorker {
    pub fn new(default_icon: impl Into<String>) -> Self {
        Self {
            params: None,
            default_icon: default_icon.into(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.params.is_some()
    }

    pub fn params(&self) -> Option<&PushInitParams> {
        self.params.as_ref()
    }

    /// Handles one posted message. Returns the notification that was shown, if any.
    pub fn receive(&mut self, raw: &str, sink: &dyn NotificationSink) -> Result<Option<Notification>, StorefrontError> {
        let message: WorkerMessage = serde_json::from_str(raw)?;

        match message {
            WorkerMessage::Init(params) => {
                tracing::info!(project_id = %params.project_id, "push worker initialized");
                self.params = Some(params);
                Ok(None)
            }
            WorkerMessage::Push(payload) => {
                if !self.is_initialized() {
                    tracing::warn!("dropping push message received before init");
                    return Ok(None);
                }
                let notification = self.build_notification(&payload);
                if let Some(notification) = &notification {
                    sink.show(notification);
                }
                Ok(notification)
            }
        }
    }

    /// Builds a notification from a push payload of the shape
    /// `{ notification: { title, body, image? }, data: { url?, ticket_id?, order_id? } }`.
    /// Payloads without a title are ignored.
    pub fn build_notification(&self, payload: &Value) -> Option<Notification> {
        let notification = payload.get("notification").unwrap_or(payload);
        let data = payload.get("data");

        let title = text(notification.get("title"))?;
        let body = text(notification.get("body")).unwrap_or_default();
        let icon = text(notification.get("image"))
            .or_else(|| text(notification.get("icon")))
            .unwrap_or_else(|| self.default_icon.clone());

        let field = |key: &str| data.and_then(|d| text(d.get(key)));
        let (click_path, tag) = if let Some(url) = field("url") {
            (url, None)
        } else if let Some(ticket) = field("ticket_id") {
            (format!("/profile/tickets/{}", ticket), Some(format!("ticket-{}", ticket)))
        } else if let Some(order) = field("order_id") {
            (format!("/profile/orders/{}", order), Some(format!("order-{}", order)))
        } else {
            ("/".to_string(), None)
        };

        Some(Notification {
            title,
            body,
            icon,
            click_path,
            tag,
        })
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Notification>>);

    impl NotificationSink for Recorder {
        fn show(&self, notification: &Notification) {
            self.0.borrow_mut().push(notification.clone());
        }
    }

    const INIT: &str = r#"{"type":"init","payload":{"apiKey":"k","projectId":"roam-prod","messagingSenderId":"1","appId":"a"}}"#;

    #[test]
    fn drops_pushes_before_init() {
        let sink = Recorder::default();
        let mut worker = PushWorker::new("/icon.png");
        let shown = worker
            .receive(r#"{"type":"push","payload":{"notification":{"title":"Hi"}}}"#, &sink)
            .unwrap();
        assert_eq!(shown, None);
        assert!(sink.0.borrow().is_empty());
    }

    #[test]
    fn shows_ticket_reply_after_init() {
        let sink = Recorder::default();
        let mut worker = PushWorker::new("/icon.png");
        worker.receive(INIT, &sink).unwrap();
        assert_eq!(worker.params().map(|p| p.project_id.as_str()), Some("roam-prod"));

        let push = r#"{"type":"push","payload":{"notification":{"title":"New reply","body":"We answered"},"data":{"ticket_id":42}}}"#;
        let shown = worker.receive(push, &sink).unwrap().unwrap();

        assert_eq!(shown.click_path, "/profile/tickets/42");
        assert_eq!(shown.tag.as_deref(), Some("ticket-42"));
        assert_eq!(shown.icon, "/icon.png");
        assert_eq!(sink.0.borrow().len(), 1);
    }

    #[test]
    fn ignores_payload_without_title() {
        let worker = PushWorker::new("/icon.png");
        assert!(worker.build_notification(&serde_json::json!({"data": {"url": "/x"}})).is_none());
    }

    #[test]
    fn rejects_unknown_message_types() {
        let sink = Recorder::default();
        let mut worker = PushWorker::new("/icon.png");
        assert!(matches!(
            worker.receive(r#"{"type":"reboot"}"#, &sink),
            Err(StorefrontError::Decode(_))
        ));
    }
}

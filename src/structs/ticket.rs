use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Support ticket with its conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub subject: String,
    pub status: TicketStatus,
    /// Oldest first. List endpoints may omit messages entirely.
    #[serde(default)]
    pub messages: Vec<TicketMessage>,
    #[serde(default)]
    pub order_id: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketMessage {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(alias = "sender_type")]
    pub sender: Sender,
    #[serde(alias = "body")]
    pub message: String,
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Why the client refuses to send a message on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBlock {
    Closed,
    AwaitingAdminReply,
}

impl Ticket {
    pub fn is_closed(&self) -> bool {
        self.status == TicketStatus::Closed
    }

    pub fn last_message(&self) -> Option<&TicketMessage> {
        self.messages.last()
    }

    /// Send gate: closed tickets never accept messages; open tickets accept
    /// one when empty or when the admin spoke last.
    ///
    /// The backend enforces the same rule; this only keeps the composer honest.
    pub fn send_block(&self) -> Option<SendBlock> {
        if self.is_closed() {
            return Some(SendBlock::Closed);
        }
        match self.last_message() {
            Some(last) if last.sender == Sender::User => Some(SendBlock::AwaitingAdminReply),
            _ => None,
        }
    }

    pub fn can_send_message(&self) -> bool {
        self.send_block().is_none()
    }
}

/// Payload for `POST /tickets`.
#[derive(Debug, Clone, Serialize)]
pub struct NewTicket {
    pub subject: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
}

/// File attached to a ticket message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Payload for `POST /tickets/{id}/messages`.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub message: String,
    pub attachment: Option<Attachment>,
}

impl NewMessage {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: Sender) -> TicketMessage {
        TicketMessage {
            id: None,
            sender,
            message: "hi".into(),
            attachment: None,
            created_at: None,
        }
    }

    fn ticket(status: TicketStatus, senders: &[Sender]) -> Ticket {
        Ticket {
            id: 1,
            subject: "No data in Spain".into(),
            status,
            messages: senders.iter().copied().map(message).collect(),
            order_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn empty_open_ticket_accepts_first_message() {
        assert!(ticket(TicketStatus::Open, &[]).can_send_message());
    }

    #[test]
    fn user_must_wait_for_admin_reply() {
        let waiting = ticket(TicketStatus::Open, &[Sender::User]);
        assert_eq!(waiting.send_block(), Some(SendBlock::AwaitingAdminReply));

        let answered = ticket(TicketStatus::Open, &[Sender::User, Sender::Admin]);
        assert!(answered.can_send_message());
    }

    #[test]
    fn closed_ticket_blocks_unconditionally() {
        for senders in [&[][..], &[Sender::Admin][..], &[Sender::User][..]] {
            let closed = ticket(TicketStatus::Closed, senders);
            assert_eq!(closed.send_block(), Some(SendBlock::Closed));
        }
    }

    #[test]
    fn decodes_sender_aliases() {
        let msg: TicketMessage =
            serde_json::from_value(serde_json::json!({"sender_type": "admin", "body": "Fixed"})).unwrap();
        assert_eq!(msg.sender, Sender::Admin);
        assert_eq!(msg.message, "Fixed");
    }
}

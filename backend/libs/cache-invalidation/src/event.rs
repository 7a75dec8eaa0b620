//! Invalidation events exchanged between contexts.
//!
//! The kind travels as a plain string so that a context running older code
//! can still decode the envelope of a kind it does not know and skip it.

use crate::{InvalidationError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Friendship changes that make cached queries stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RequestSent,
    RequestAccepted,
    RequestRejected,
    FriendRemoved,
    SentRequestCancelled,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::RequestSent,
        EventKind::RequestAccepted,
        EventKind::RequestRejected,
        EventKind::FriendRemoved,
        EventKind::SentRequestCancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RequestSent => "request-sent",
            EventKind::RequestAccepted => "request-accepted",
            EventKind::RequestRejected => "request-rejected",
            EventKind::FriendRemoved => "friend-removed",
            EventKind::SentRequestCancelled => "sent-request-cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers needed to decide what went stale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl EventPayload {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn with_other_user(mut self, other_user_id: impl Into<String>) -> Self {
        self.other_user_id = Some(other_user_id.into());
        self
    }

    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Event as published on the channel
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidationEvent {
    pub kind: EventKind,
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

/// Wire shape; the kind stays a string until it is recognised
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    event_kind: String,
    #[serde(default)]
    payload: serde_json::Value,
    timestamp: DateTime<Utc>,
}

/// Result of decoding a received frame
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Known(InvalidationEvent),
    Unknown {
        event_kind: String,
        timestamp: DateTime<Utc>,
    },
}

impl InvalidationEvent {
    /// New event stamped with the current time
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        let envelope = Envelope {
            event_kind: self.kind.as_str().to_string(),
            payload: serde_json::to_value(&self.payload)?,
            timestamp: self.timestamp,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    pub fn decode(raw: &str) -> Result<Decoded> {
        let envelope: Envelope = serde_json::from_str(raw)?;

        let Some(kind) = EventKind::parse(&envelope.event_kind) else {
            return Ok(Decoded::Unknown {
                event_kind: envelope.event_kind,
                timestamp: envelope.timestamp,
            });
        };

        let payload: EventPayload = serde_json::from_value(envelope.payload).map_err(|e| {
            InvalidationError::InvalidMessage(format!("bad payload for {}: {}", kind, e))
        })?;

        Ok(Decoded::Known(InvalidationEvent {
            kind,
            payload,
            timestamp: envelope.timestamp,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_strings() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::RequestAccepted.to_string(), "request-accepted");
        assert_eq!(EventKind::parse("book-finished"), None);
    }

    #[test]
    fn test_encode_decode() {
        let event = InvalidationEvent::new(
            EventKind::RequestAccepted,
            EventPayload::new("u1").with_other_user("u2").with_request("r9"),
        );

        let raw = event.encode().unwrap();
        assert!(raw.contains("\"event_kind\":\"request-accepted\""));
        assert_eq!(InvalidationEvent::decode(&raw).unwrap(), Decoded::Known(event));
    }

    #[test]
    fn test_optional_fields_omitted() {
        let event = InvalidationEvent::new(EventKind::FriendRemoved, EventPayload::new("u1"));
        let raw = event.encode().unwrap();
        assert!(!raw.contains("request_id"));
        assert!(!raw.contains("other_user_id"));
    }

    #[test]
    fn test_decode_unknown_kind() {
        let raw = r#"{"event_kind":"book-club-joined","payload":{"club":"c1"},"timestamp":"2026-01-05T10:00:00Z"}"#;
        match InvalidationEvent::decode(raw).unwrap() {
            Decoded::Unknown { event_kind, .. } => assert_eq!(event_kind, "book-club-joined"),
            other => panic!("expected unknown kind, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_ignores_extra_payload_fields() {
        let raw = r#"{"event_kind":"request-sent","payload":{"user_id":"u1","note":"hi"},"timestamp":"2026-01-05T10:00:00Z"}"#;
        match InvalidationEvent::decode(raw).unwrap() {
            Decoded::Known(event) => {
                assert_eq!(event.kind, EventKind::RequestSent);
                assert_eq!(event.payload.user_id, "u1");
            }
            other => panic!("expected known kind, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed() {
        assert!(InvalidationEvent::decode("not json").is_err());
        let bad_payload = r#"{"event_kind":"request-sent","payload":{"user_id":5},"timestamp":"2026-01-05T10:00:00Z"}"#;
        assert!(matches!(
            InvalidationEvent::decode(bad_payload),
            Err(InvalidationError::InvalidMessage(_))
        ));
    }
}

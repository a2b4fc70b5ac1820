use crate::error::{AgentError, Result};
use std::fmt;

/// Where an agent receives its purchases from.
///
/// Anything containing a `/` is a topic (direct, best-effort delivery);
/// anything else names a queue (guaranteed, acknowledged delivery).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Topic(String),
    Queue(String),
}

impl Destination {
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AgentError::Config("destination must not be empty".into()));
        }
        if name.contains('/') {
            Ok(Self::Topic(name.to_string()))
        } else {
            Ok(Self::Queue(name.to_string()))
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Topic(name) | Self::Queue(name) => name,
        }
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        match self {
            Self::Topic(_) => DeliveryMode::Direct,
            Self::Queue(_) => DeliveryMode::Guaranteed,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topic(name) => write!(f, "topic {name}"),
            Self::Queue(name) => write!(f, "queue {name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Direct,
    Guaranteed,
}

/// Message types used as the first topic segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Purchase,
    Confirm,
    Loyalty,
    Fraud,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Confirm => "confirm",
            Self::Loyalty => "loyalty",
            Self::Fraud => "fraud",
        }
    }
}

/// The `{type}/{location}/{client}` address carried by every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicAddress {
    pub kind: String,
    pub location: String,
    pub client_id: String,
}

impl TopicAddress {
    /// Splits a concrete topic name into its segments.
    ///
    /// Segments past the third are ignored. Fewer than three segments, or an
    /// empty location or client, is a `MalformedTopic`.
    pub fn parse(topic: &str) -> Result<Self> {
        let mut parts = topic.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(kind), Some(location), Some(client_id))
                if !location.is_empty() && !client_id.is_empty() =>
            {
                Ok(Self {
                    kind: kind.to_string(),
                    location: location.to_string(),
                    client_id: client_id.to_string(),
                })
            }
            _ => Err(AgentError::MalformedTopic(topic.to_string())),
        }
    }

    pub fn topic(kind: MessageKind, location: &str, client_id: &str) -> String {
        format!("{}/{}/{}", kind.as_str(), location, client_id)
    }
}

/// Matches a concrete topic against a subscription filter.
///
/// Understands both wildcard dialects: `*` or `+` match one level, a trailing
/// `>` or `#` matches one or more remaining levels.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some(">" | "#"), Some(_)) => return filter_levels.next().is_none(),
            (Some("*" | "+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_selection_is_syntactic() {
        assert_eq!(
            Destination::parse("purchase/>").unwrap(),
            Destination::Topic("purchase/>".into())
        );
        assert_eq!(
            Destination::parse("fraud_queue").unwrap().delivery_mode(),
            DeliveryMode::Guaranteed
        );
        assert!(matches!(
            Destination::parse("  "),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn test_topic_address_parse() {
        let addr = TopicAddress::parse("purchase/ottawa/C1").unwrap();
        assert_eq!(addr.kind, "purchase");
        assert_eq!(addr.location, "ottawa");
        assert_eq!(addr.client_id, "C1");
    }

    #[test]
    fn test_topic_address_rejects_short_topics() {
        for bad in ["purchase", "purchase/ottawa", "purchase//C1", "purchase/ottawa/"] {
            assert!(
                matches!(TopicAddress::parse(bad), Err(AgentError::MalformedTopic(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_outbound_topic_format() {
        assert_eq!(
            TopicAddress::topic(MessageKind::Fraud, "ottawa", "C1"),
            "fraud/ottawa/C1"
        );
    }

    #[test]
    fn test_topic_matches_wildcards() {
        assert!(topic_matches("purchase/>", "purchase/ottawa/C1"));
        assert!(topic_matches("purchase/#", "purchase/ottawa/C1"));
        assert!(topic_matches("purchase/*/C1", "purchase/ottawa/C1"));
        assert!(topic_matches("purchase/+/+", "purchase/ottawa/C1"));
        assert!(topic_matches("purchase/ottawa/C1", "purchase/ottawa/C1"));

        assert!(!topic_matches("purchase/>", "purchase"));
        assert!(!topic_matches("purchase/*", "purchase/ottawa/C1"));
        assert!(!topic_matches("confirm/>", "purchase/ottawa/C1"));
        assert!(!topic_matches("purchase/ottawa/C1/x", "purchase/ottawa/C1"));
    }
}

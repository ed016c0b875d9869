//! Live Query Message Types
//!
//! Defines the JSON messages exchanged with the data service over the live
//! query WebSocket.

use serde::{Deserialize, Serialize};

use crate::model::{ExpenseRecord, Snapshot};

/// Messages sent from client to service
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ping for keepalive
    Ping,
}

/// Messages sent from service to client
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full listing of the collection
    Snapshot {
        #[serde(default)]
        items: Vec<ExpenseRecord>,
        #[serde(default)]
        is_synced: bool,
    },
    /// Pong response to ping
    Pong,
    /// Error reported by the service
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    /// The snapshot carried by this message, if any
    pub fn into_snapshot(self) -> Option<Snapshot> {
        match self {
            ServerMessage::Snapshot { items, is_synced } => Some(Snapshot { items, is_synced }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_deserialize_snapshot() {
        let json = r#"{
            "type": "snapshot",
            "items": [{"id": "e-1", "name": "Coffee", "amount": 4.5, "owner": null}],
            "is_synced": true
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let snapshot = msg.into_snapshot().unwrap();
        assert!(snapshot.is_synced);
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].amount, Some(4.5));
    }

    #[test]
    fn test_server_message_deserialize_empty_snapshot() {
        let json = r#"{"type": "snapshot"}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let snapshot = msg.into_snapshot().unwrap();
        assert!(snapshot.items.is_empty());
        assert!(!snapshot.is_synced);
    }

    #[test]
    fn test_server_message_deserialize_error() {
        let json = r#"{"type": "error", "message": "unauthorized"}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        match msg {
            ServerMessage::Error { message } => assert_eq!(message, "unauthorized"),
            _ => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_client_message_serialize_ping() {
        let json = serde_json::to_string(&ClientMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }
}

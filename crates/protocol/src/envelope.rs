use serde::{Deserialize, Serialize};

use crate::constants::MessageType;

/// Envelope for all SSAP communication, both directions.
///
/// The `payload` field uses `serde_json::value::RawValue` to defer
/// deserialization until the message type is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<serde_json::value::RawValue>>,
    /// Error description sent by the TV on `error` messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Message {
    /// Creates a new message with the given type, target URI, and payload.
    pub fn new<T: Serialize>(
        id: i64,
        msg_type: MessageType,
        uri: impl Into<String>,
        payload: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        let raw = match payload {
            Some(p) => {
                let json = serde_json::to_string(p)?;
                Some(serde_json::value::RawValue::from_string(json)?)
            }
            None => None,
        };
        Ok(Self {
            id,
            msg_type,
            uri: uri.into(),
            payload: raw,
            error: None,
        })
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        match &self.payload {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_new_with_payload() {
        let payload = serde_json::json!({"id": "youtube.leanback.v4"});
        let msg = Message::new(
            3,
            MessageType::Request,
            "ssap://system.launcher/launch",
            Some(&payload),
        )
        .unwrap();
        assert_eq!(msg.id, 3);
        assert_eq!(msg.msg_type, MessageType::Request);
        assert!(msg.payload.is_some());
        assert!(msg.error.is_none());
    }

    #[test]
    fn message_new_without_payload() {
        let msg = Message::new::<()>(0, MessageType::Register, "", None).unwrap();
        assert!(msg.payload.is_none());
    }

    #[test]
    fn message_omits_empty_fields() {
        let msg = Message::new::<()>(0, MessageType::Register, "", None).unwrap();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("uri"));
        assert!(!json.contains("payload"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn message_id_is_integer_on_the_wire() {
        let msg = Message::new::<()>(7, MessageType::Request, "ssap://audio/volumeUp", None)
            .unwrap();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"id\":7"));
    }

    #[test]
    fn message_json_roundtrip() {
        let payload = serde_json::json!({"alertId": "alert-123"});
        let msg = Message::new(-999, MessageType::Response, "", Some(&payload)).unwrap();
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, -999);
        assert_eq!(parsed.msg_type, MessageType::Response);
        let value: serde_json::Value = parsed.parse_payload().unwrap().unwrap();
        assert_eq!(value["alertId"], "alert-123");
    }

    #[test]
    fn inbound_error_message_parses() {
        let json = r#"{"id":0,"type":"error","error":"403 access denied","payload":{}}"#;
        let parsed: Message = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.msg_type, MessageType::Error);
        assert_eq!(parsed.error.as_deref(), Some("403 access denied"));
    }
}

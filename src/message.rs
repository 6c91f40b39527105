//! # Inbound push messages.
//!
//! The transport delivers JSON text shaped as `{"event": "<name>", ...payload}`.
//! [`PushMessage::decode`] extracts the event name and keeps the whole decoded object
//! as [`PushMessage::data`], which is what handlers receive.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::MessageError;

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    /// Name of the event, taken from the `event` field.
    pub event: String,
    /// The full decoded payload (including `event`).
    pub data: Value,
}

impl PushMessage {
    /// Decodes a raw channel payload.
    ///
    /// # Example
    /// ```
    /// use pushvisor::PushMessage;
    ///
    /// let msg = PushMessage::decode(r#"{"event":"order-created","id":7}"#).unwrap();
    /// assert_eq!(msg.event, "order-created");
    /// assert_eq!(msg.data["id"], 7);
    /// ```
    pub fn decode(raw: &str) -> Result<Self, MessageError> {
        let data: Value = serde_json::from_str(raw)?;
        let event = match &data {
            Value::Object(map) => match map.get("event") {
                Some(Value::String(name)) => name.clone(),
                _ => return Err(MessageError::MissingEvent),
            },
            _ => return Err(MessageError::NotAnObject),
        };
        Ok(Self { event, data })
    }

    /// Returns a payload field by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Deserializes the whole payload into a typed value.
    ///
    /// # Example
    /// ```
    /// use pushvisor::PushMessage;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct OrderCreated { id: u64 }
    ///
    /// let msg = PushMessage::decode(r#"{"event":"order-created","id":7}"#).unwrap();
    /// assert_eq!(msg.data_as::<OrderCreated>().unwrap().id, 7);
    /// ```
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        Ok(T::deserialize(&self.data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_event_and_keeps_full_payload() {
        let msg = PushMessage::decode(r#"{"event":"fake-event","count":3}"#).unwrap();
        assert_eq!(msg.event, "fake-event");
        assert_eq!(msg.data, json!({"event": "fake-event", "count": 3}));
        assert_eq!(msg.get("count"), Some(&json!(3)));
    }

    #[test]
    fn typed_payload() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Tick {
            event: String,
            n: u32,
        }
        let msg = PushMessage::decode(r#"{"event":"tick","n":4}"#).unwrap();
        assert_eq!(
            msg.data_as::<Tick>().unwrap(),
            Tick {
                event: "tick".into(),
                n: 4
            }
        );
        assert!(matches!(
            msg.data_as::<Vec<u8>>().unwrap_err(),
            MessageError::Json(_)
        ));
    }

    #[test]
    fn rejects_broken_json() {
        let err = PushMessage::decode("{\"event\":").unwrap_err();
        assert!(matches!(err, MessageError::Json(_)));
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(
            PushMessage::decode("[1,2]").unwrap_err(),
            MessageError::NotAnObject
        ));
        assert!(matches!(
            PushMessage::decode("\"event\"").unwrap_err(),
            MessageError::NotAnObject
        ));
    }

    #[test]
    fn rejects_missing_or_non_string_event() {
        assert!(matches!(
            PushMessage::decode(r#"{"type":"x"}"#).unwrap_err(),
            MessageError::MissingEvent
        ));
        assert!(matches!(
            PushMessage::decode(r#"{"event":5}"#).unwrap_err(),
            MessageError::MissingEvent
        ));
    }
}

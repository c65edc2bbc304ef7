//! Wire format of the simulation server feed.
//!
//! Client → server: a single text frame at open time carrying the client id
//! in decimal. Server → client: one JSON object per update,
//! `{ "pdr": <0..=1>, "drops": [ { "exploded": <bool> }, ... ] }`.

use serde::Deserialize;
use serde_json::Value;

use crate::api::error::{validate_pdr, FieldError};
use crate::api::types::DropEvent;

/// One decoded server update. Only produced when the whole message is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerUpdate {
    pub pdr: f64,
    pub drops: Vec<DropEvent>,
}

impl ServerUpdate {
    /// Decode and validate a server text frame.
    pub fn from_json(text: &str) -> Result<Self, FieldError> {
        let value: Value = serde_json::from_str(text)?;
        require_objects(&value)?;
        let update: ServerUpdate = serde_json::from_value(value)?;
        validate_pdr(update.pdr)?;
        Ok(update)
    }
}

/// Derived `Deserialize` also accepts arrays in field order; the wire format
/// only has objects, for the update and for each drop.
fn require_objects(value: &Value) -> Result<(), FieldError> {
    let Some(update) = value.as_object() else {
        return Err(FieldError::MalformedMessage("update is not an object".to_string()));
    };
    if let Some(Value::Array(drops)) = update.get("drops") {
        if let Some(pos) = drops.iter().position(|drop| !drop.is_object()) {
            return Err(FieldError::MalformedMessage(format!("drop {pos} is not an object")));
        }
    }
    Ok(())
}

/// Body of the opening handshake frame.
pub fn handshake(client_id: u64) -> String {
    client_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_update() {
        let update =
            ServerUpdate::from_json(r#"{"pdr":0.5,"drops":[{"exploded":false},{"exploded":true}]}"#).unwrap();
        assert_eq!(update.pdr, 0.5);
        assert_eq!(update.drops, vec![DropEvent::normal(), DropEvent::exploded()]);
    }

    #[test]
    fn parse_update_without_drops_list_entries() {
        let update = ServerUpdate::from_json(r#"{ "pdr": 1, "drops": [] }"#).unwrap();
        assert_eq!(update.pdr, 1.0);
        assert!(update.drops.is_empty());
    }

    #[test]
    fn missing_field_is_malformed() {
        let err = ServerUpdate::from_json(r#"{"pdr":0.5}"#).unwrap_err();
        assert!(matches!(err, FieldError::MalformedMessage(_)));
        let err = ServerUpdate::from_json(r#"{"drops":[]}"#).unwrap_err();
        assert!(matches!(err, FieldError::MalformedMessage(_)));
    }

    #[test]
    fn wrong_types_are_malformed() {
        for text in [
            r#"{"pdr":"0.5","drops":[]}"#,
            r#"{"pdr":0.5,"drops":{"exploded":true}}"#,
            r#"{"pdr":0.5,"drops":[{"exploded":1}]}"#,
            r#"{"pdr":0.5,"drops":[{}]}"#,
            r#"[0.5, []]"#,
            "not json",
        ] {
            assert!(
                matches!(ServerUpdate::from_json(text), Err(FieldError::MalformedMessage(_))),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn positional_arrays_are_malformed() {
        for text in [
            r#"[0.5, [[true]]]"#,
            r#"[0.5, [{"exploded":true}]]"#,
            r#"{"pdr":0.5,"drops":[[true]]}"#,
            r#"{"pdr":0.5,"drops":[{"exploded":false},[true]]}"#,
        ] {
            assert!(
                matches!(ServerUpdate::from_json(text), Err(FieldError::MalformedMessage(_))),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn extra_fields_are_rejected() {
        assert!(ServerUpdate::from_json(r#"{"pdr":0.5,"drops":[],"ttl":3}"#).is_err());
    }

    #[test]
    fn out_of_range_pdr_rejected() {
        let err = ServerUpdate::from_json(r#"{"pdr":1.5,"drops":[]}"#).unwrap_err();
        assert_eq!(err, FieldError::PdrOutOfRange(1.5));
    }

    #[test]
    fn handshake_is_decimal_id() {
        assert_eq!(handshake(8464), "8464");
        assert_eq!(handshake(0), "0");
    }
}

//! Alert payload for the Luna workaround.
//!
//! The TV refuses `luna://` requests from external clients. The
//! workaround creates a user alert whose single button's `onClick`, and
//! the alert's `onclose` and `onfail` hooks, all point at the real Luna
//! URI: whichever way the alert leaves the screen, the TV invokes the
//! target on its internal bus. The alert is sent under
//! [`crate::constants::ALERT_HACK_ID`] so the connection layer can
//! recognise the creation response and dismiss the alert immediately.

use serde::Deserialize;
use serde_json::json;

/// `alertId` field of the createAlert response payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertCreatedPayload {
    #[serde(rename = "alertId", default)]
    pub alert_id: String,
}

/// Builds the createAlert payload wrapping a Luna call.
pub fn alert_payload(uri: &str, params: &serde_json::Value) -> serde_json::Value {
    json!({
        "message": " ",
        "buttons": [{
            "label": "",
            "onClick": uri,
            "params": params,
        }],
        "onclose": { "uri": uri, "params": params },
        "onfail": { "uri": uri, "params": params },
    })
}

/// Builds the closeAlert payload for a created alert.
pub fn close_alert_payload(alert_id: &str) -> serde_json::Value {
    json!({ "alertId": alert_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_hooks_point_at_the_target() {
        let params = json!({"category": "picture", "settings": {"energySaving": "off"}});
        let uri = "luna://com.webos.settingsservice/setSystemSettings";
        let payload = alert_payload(uri, &params);

        assert_eq!(payload["buttons"][0]["onClick"], uri);
        assert_eq!(payload["buttons"][0]["params"], params);
        assert_eq!(payload["onclose"]["uri"], uri);
        assert_eq!(payload["onclose"]["params"], params);
        assert_eq!(payload["onfail"]["uri"], uri);
        assert_eq!(payload["onfail"]["params"], params);
    }

    #[test]
    fn button_label_is_blank() {
        let payload = alert_payload("luna://x/y", &json!({}));
        assert_eq!(payload["buttons"][0]["label"], "");
        assert_eq!(payload["buttons"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn alert_created_payload_parses() {
        let parsed: AlertCreatedPayload =
            serde_json::from_str(r#"{"alertId":"com.lge.test-1"}"#).unwrap();
        assert_eq!(parsed.alert_id, "com.lge.test-1");
    }

    #[test]
    fn close_payload_carries_id() {
        let payload = close_alert_payload("alert-7");
        assert_eq!(payload["alertId"], "alert-7");
    }
}

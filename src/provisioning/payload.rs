//! `POST /api/config` payload parsing and validation.

use core::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::adapters::wifi::{validate_password, validate_ssid};
use crate::config::DeviceConfig;

/// Largest accepted request body.
pub const MAX_CONFIG_BODY: usize = 512;

/// Why a submission was refused.  Each variant carries its HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BodyTooLarge(usize),
    InvalidJson,
    MissingFields,
    EmptyApiKey,
    InvalidSsid,
    InvalidPassword,
    AlreadyReceived,
    /// The provisioning wait ended; the device is about to restart.
    WindowClosed,
}

impl ValidationError {
    pub const fn status(&self) -> u16 {
        match self {
            Self::BodyTooLarge(_) => 413,
            Self::AlreadyReceived => 409,
            Self::WindowClosed => 503,
            _ => 400,
        }
    }

    /// Text for the `message` field of the error response.
    pub const fn message(&self) -> &'static str {
        match self {
            Self::BodyTooLarge(_) => "Request body too large",
            Self::InvalidJson => "Invalid JSON",
            Self::MissingFields => "Missing required fields",
            Self::EmptyApiKey => "api_key must not be empty",
            Self::InvalidSsid => "ssid must be 1-32 printable ASCII characters",
            Self::InvalidPassword => "password must be empty or 8-64 characters",
            Self::AlreadyReceived => "Configuration already received",
            Self::WindowClosed => "Provisioning window closed",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BodyTooLarge(len) => write!(f, "body of {} bytes exceeds {}", len, MAX_CONFIG_BODY),
            other => f.write_str(other.message()),
        }
    }
}

/// Wire shape of a submission.  Every field is optional so a wrong type
/// or an absent key both surface as `MissingFields`.
#[derive(Debug, Deserialize)]
struct Submission {
    #[serde(default, deserialize_with = "text")]
    api_key: Option<String>,
    #[serde(default, deserialize_with = "text")]
    ssid: Option<String>,
    #[serde(default, deserialize_with = "text")]
    password: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    motion: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    sound: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    gas: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    fire: Option<bool>,
}

fn text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Integer (`0`/non-zero) or JSON boolean.
fn flag<'de, D: Deserializer<'de>>(de: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    })
}

/// Parse and validate a configuration submission.
///
/// A field of the wrong JSON type counts as missing.
pub fn parse_payload(body: &[u8]) -> Result<DeviceConfig, ValidationError> {
    if body.len() > MAX_CONFIG_BODY {
        return Err(ValidationError::BodyTooLarge(body.len()));
    }
    let value: Value = serde_json::from_slice(body).map_err(|_| ValidationError::InvalidJson)?;
    if !value.is_object() {
        return Err(ValidationError::InvalidJson);
    }
    let submission = Submission::deserialize(value).map_err(|_| ValidationError::InvalidJson)?;

    let Submission {
        api_key: Some(api_key),
        ssid: Some(ssid),
        password: Some(password),
        motion: Some(motion),
        sound: Some(sound),
        gas: Some(gas),
        fire: Some(fire),
    } = submission
    else {
        return Err(ValidationError::MissingFields);
    };

    if api_key.is_empty() {
        return Err(ValidationError::EmptyApiKey);
    }
    validate_ssid(&ssid).map_err(|_| ValidationError::InvalidSsid)?;
    validate_password(&password).map_err(|_| ValidationError::InvalidPassword)?;

    Ok(DeviceConfig {
        api_key,
        network_ssid: ssid,
        network_password: password,
        motion,
        sound,
        gas,
        fire,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"api_key":"k1","ssid":"HomeWiFi","password":"mysecret8","motion":1,"sound":0,"gas":1,"fire":0}"#;

    #[test]
    fn valid_payload() {
        let cfg = parse_payload(VALID.as_bytes()).unwrap();
        assert_eq!(cfg.api_key, "k1");
        assert_eq!(cfg.network_ssid, "HomeWiFi");
        assert_eq!(cfg.network_password, "mysecret8");
        assert!(cfg.motion && !cfg.sound && cfg.gas && !cfg.fire);
    }

    #[test]
    fn booleans_accepted_for_flags() {
        let body = r#"{"api_key":"k","ssid":"n","password":"","motion":true,"sound":false,"gas":false,"fire":true}"#;
        let cfg = parse_payload(body.as_bytes()).unwrap();
        assert!(cfg.motion && cfg.fire && !cfg.gas);
    }

    #[test]
    fn missing_fire_is_reported() {
        let body = r#"{"api_key":"k","ssid":"n","password":"","motion":1,"sound":0,"gas":1}"#;
        assert_eq!(parse_payload(body.as_bytes()), Err(ValidationError::MissingFields));
    }

    #[test]
    fn wrong_type_counts_as_missing() {
        let body = r#"{"api_key":7,"ssid":"n","password":"","motion":1,"sound":0,"gas":1,"fire":0}"#;
        assert_eq!(parse_payload(body.as_bytes()), Err(ValidationError::MissingFields));
        let body = r#"{"api_key":"k","ssid":"n","password":"","motion":"yes","sound":0,"gas":1,"fire":0}"#;
        assert_eq!(parse_payload(body.as_bytes()), Err(ValidationError::MissingFields));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let body = VALID.replace(r#""fire":0"#, r#""fire":0,"firmware":"1.2""#);
        assert!(parse_payload(body.as_bytes()).is_ok());
    }

    #[test]
    fn null_and_float_flags_count_as_missing() {
        let body = VALID.replace(r#""gas":1"#, r#""gas":null"#);
        assert_eq!(parse_payload(body.as_bytes()), Err(ValidationError::MissingFields));
        let body = VALID.replace(r#""gas":1"#, r#""gas":1.5"#);
        assert_eq!(parse_payload(body.as_bytes()), Err(ValidationError::MissingFields));
    }

    #[test]
    fn malformed_json() {
        assert_eq!(parse_payload(b"{not json"), Err(ValidationError::InvalidJson));
        assert_eq!(parse_payload(b"[1,2,3]"), Err(ValidationError::InvalidJson));
        assert_eq!(parse_payload(b""), Err(ValidationError::InvalidJson));
    }

    #[test]
    fn oversized_body() {
        let body = vec![b' '; MAX_CONFIG_BODY + 1];
        let err = parse_payload(&body).unwrap_err();
        assert_eq!(err, ValidationError::BodyTooLarge(MAX_CONFIG_BODY + 1));
        assert_eq!(err.status(), 413);
    }

    #[test]
    fn credential_rules() {
        let empty_key = VALID.replace(r#""api_key":"k1""#, r#""api_key":"""#);
        assert_eq!(parse_payload(empty_key.as_bytes()), Err(ValidationError::EmptyApiKey));

        let short_pw = VALID.replace("mysecret8", "short");
        assert_eq!(parse_payload(short_pw.as_bytes()), Err(ValidationError::InvalidPassword));

        let long_ssid = VALID.replace("HomeWiFi", &"s".repeat(33));
        assert_eq!(parse_payload(long_ssid.as_bytes()), Err(ValidationError::InvalidSsid));
    }

    #[test]
    fn status_codes() {
        assert_eq!(ValidationError::MissingFields.status(), 400);
        assert_eq!(ValidationError::AlreadyReceived.status(), 409);
        assert_eq!(ValidationError::WindowClosed.status(), 503);
        assert_eq!(ValidationError::InvalidJson.message(), "Invalid JSON");
    }
}

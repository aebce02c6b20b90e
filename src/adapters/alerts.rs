//! HTTPS delivery of events to the remote collector.
//!
//! `POST https://<host>/api/send_<category>` with a bearer token and a JSON
//! body `{"<category>_type": "<subtype>", "message": "..."}`.  Delivery is
//! fire-and-forget: failures are logged and dropped.

use log::{info, warn};
use serde_json::{Map, Value};

use crate::app::events::{AlertEvent, EventCategory};
use crate::app::ports::{AlertPort, NetworkError};

#[cfg(target_os = "espidf")]
const REQUEST_TIMEOUT: core::time::Duration = core::time::Duration::from_secs(10);

/// Collector URL for `category`.
pub fn endpoint_url(host: &str, category: EventCategory) -> String {
    format!("https://{}/api/send_{}", host, category.tag())
}

/// Request body for `event`.  An absent or empty message is omitted.
pub fn build_body(event: &AlertEvent) -> Value {
    let mut body = Map::new();
    body.insert(
        format!("{}_type", event.category.tag()),
        Value::String(event.subtype.to_lowercase()),
    );
    if let Some(msg) = event.message.as_deref().filter(|m| !m.is_empty()) {
        body.insert("message".into(), Value::String(msg.into()));
    }
    Value::Object(body)
}

#[cfg(target_os = "espidf")]
fn http<E: core::fmt::Debug>(e: E) -> NetworkError {
    NetworkError::Http(format!("{e:?}"))
}

#[derive(Debug, Clone)]
pub struct HttpAlertDispatcher {
    host: String,
}

impl HttpAlertDispatcher {
    pub fn new(host: &str) -> Self {
        Self { host: host.into() }
    }

    #[cfg(target_os = "espidf")]
    fn post(&self, url: &str, api_key: &str, body: &[u8]) -> Result<u16, NetworkError> {
        use embedded_svc::http::client::Client as HttpClient;
        use embedded_svc::http::Method;
        use embedded_svc::io::Write;
        use esp_idf_svc::http::client::{Configuration as HttpClientConfiguration, EspHttpConnection};

        let conf = HttpClientConfiguration {
            timeout: Some(REQUEST_TIMEOUT),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let mut client = HttpClient::wrap(EspHttpConnection::new(&conf).map_err(http)?);

        let auth = format!("Bearer {}", api_key);
        let len = body.len().to_string();
        let headers = [
            ("Authorization", auth.as_str()),
            ("Content-Type", "application/json"),
            ("Content-Length", len.as_str()),
        ];
        let mut request = client.request(Method::Post, url, &headers).map_err(http)?;
        request.write_all(body).map_err(http)?;
        request.flush().map_err(http)?;
        let response = request.submit().map_err(http)?;
        Ok(response.status())
    }

    #[cfg(not(target_os = "espidf"))]
    fn post(&self, url: &str, _api_key: &str, body: &[u8]) -> Result<u16, NetworkError> {
        info!(
            "alerts(sim): POST {} {}",
            url,
            String::from_utf8_lossy(body)
        );
        Ok(200)
    }
}

impl AlertPort for HttpAlertDispatcher {
    fn send(&self, api_key: &str, event: &AlertEvent) {
        let url = endpoint_url(&self.host, event.category);
        let body = match serde_json::to_vec(&build_body(event)) {
            Ok(b) => b,
            Err(e) => {
                warn!("alerts: failed to encode {} event: {}", event.category, e);
                return;
            }
        };
        match self.post(&url, api_key, &body) {
            Ok(status) => info!("alerts: {} '{}' -> HTTP {}", event.category, event.subtype, status),
            Err(e) => warn!("alerts: {} '{}' not delivered: {}", event.category, event.subtype, e),
        }
    }
}

//! HTTP contract of the provisioning endpoint.
//!
//! Drives the in-process routing of `HttpServerAdapter` so the same
//! handlers the device registers are exercised end to end.

use std::thread;

use core::time::Duration;

use hazardwatch::adapters::http_server::{CHECK_PATH, CONFIG_PATH, HttpServerAdapter, ServerHandle};
use hazardwatch::app::ports::ProvisioningEndpoint;
use hazardwatch::provisioning::{ConfigurationIngestService, HttpReply, MAX_CONFIG_BODY};
use serde_json::Value;

const VALID: &str = r#"{"api_key":"key-123","ssid":"HomeNet","password":"password1","motion":1,"sound":0,"gas":1,"fire":0}"#;

fn endpoint() -> (ServerHandle, ConfigurationIngestService) {
    let ingest = ConfigurationIngestService::new();
    let handle = HttpServerAdapter::new().start(ingest.clone()).unwrap();
    (handle, ingest)
}

fn json(reply: &HttpReply) -> Value {
    serde_json::from_str(&reply.body).unwrap()
}

fn assert_error(reply: &HttpReply, status: u16, message: &str) {
    assert_eq!(reply.status, status);
    let body = json(reply);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], message);
}

fn short_wait(ingest: &ConfigurationIngestService) -> bool {
    ingest
        .await_submission(Some(Duration::from_millis(30)), Duration::from_millis(10))
        .is_ok()
}

#[test]
fn check_reports_success() {
    let (server, _) = endpoint();
    let reply = server.get(CHECK_PATH);
    assert_eq!(reply.status, 200);
    assert_eq!(json(&reply)["status"], "success");
}

#[test]
fn valid_submission_completes_the_wait() {
    let (server, ingest) = endpoint();
    let waiter = {
        let ingest = ingest.clone();
        thread::spawn(move || ingest.await_submission(Some(Duration::from_secs(5)), Duration::from_secs(1)))
    };

    thread::sleep(Duration::from_millis(20));
    let reply = server.post(CONFIG_PATH, VALID.as_bytes());
    assert_eq!(reply.status, 200);
    assert_eq!(json(&reply)["status"], "success");

    let cfg = waiter.join().unwrap().unwrap();
    assert_eq!(cfg.api_key, "key-123");
    assert_eq!(cfg.network_ssid, "HomeNet");
    assert_eq!(cfg.network_password, "password1");
    assert!(cfg.motion && !cfg.sound && cfg.gas && !cfg.fire);
}

#[test]
fn missing_fire_is_rejected_and_wait_continues() {
    let (server, ingest) = endpoint();
    let waiter = {
        let ingest = ingest.clone();
        thread::spawn(move || ingest.await_submission(Some(Duration::from_secs(5)), Duration::from_secs(1)))
    };
    let body = r#"{"api_key":"k","ssid":"HomeNet","password":"password1","motion":1,"sound":1,"gas":1}"#;

    assert_error(&server.post(CONFIG_PATH, body.as_bytes()), 400, "Missing required fields");
    assert!(!ingest.is_received());

    // A corrected submission still completes the same wait.
    assert_eq!(server.post(CONFIG_PATH, VALID.as_bytes()).status, 200);
    assert_eq!(waiter.join().unwrap().unwrap().api_key, "key-123");
}

#[test]
fn submission_after_timed_out_wait_is_refused() {
    let (server, ingest) = endpoint();
    assert!(!short_wait(&ingest));

    assert_error(
        &server.post(CONFIG_PATH, VALID.as_bytes()),
        503,
        "Provisioning window closed",
    );
    assert!(!ingest.is_received());
    assert_eq!(server.get(CHECK_PATH).status, 200);
}

#[test]
fn malformed_json_is_rejected() {
    let (server, ingest) = endpoint();
    assert_error(&server.post(CONFIG_PATH, b"{\"api_key\":"), 400, "Invalid JSON");
    assert_error(&server.post(CONFIG_PATH, b"[1,2,3]"), 400, "Invalid JSON");
    assert!(!ingest.is_received());
}

#[test]
fn second_submission_gets_409_and_keeps_first() {
    let (server, ingest) = endpoint();
    assert_eq!(server.post(CONFIG_PATH, VALID.as_bytes()).status, 200);

    let other = VALID.replace("key-123", "key-999");
    assert_error(
        &server.post(CONFIG_PATH, other.as_bytes()),
        409,
        "Configuration already received",
    );

    let cfg = ingest
        .await_submission(Some(Duration::from_millis(10)), Duration::from_millis(10))
        .unwrap();
    assert_eq!(cfg.api_key, "key-123");
}

#[test]
fn oversized_body_is_413() {
    let (server, ingest) = endpoint();
    let padding = "x".repeat(MAX_CONFIG_BODY);
    let body = VALID.replace("key-123", &padding);
    assert_error(&server.post(CONFIG_PATH, body.as_bytes()), 413, "Request body too large");
    assert!(!ingest.is_received());
}

#[test]
fn credential_rules_are_enforced() {
    let (server, _) = endpoint();

    let short_pw = VALID.replace("password1", "short");
    assert_error(
        &server.post(CONFIG_PATH, short_pw.as_bytes()),
        400,
        "password must be empty or 8-64 characters",
    );

    let long_ssid = VALID.replace("HomeNet", &"n".repeat(33));
    assert_error(
        &server.post(CONFIG_PATH, long_ssid.as_bytes()),
        400,
        "ssid must be 1-32 printable ASCII characters",
    );

    let no_key = VALID.replace("key-123", "");
    assert_error(&server.post(CONFIG_PATH, no_key.as_bytes()), 400, "api_key must not be empty");
}

#[test]
fn boolean_flags_are_accepted() {
    let (server, ingest) = endpoint();
    let body = r#"{"api_key":"k","ssid":"HomeNet","password":"","motion":true,"sound":false,"gas":false,"fire":true}"#;
    assert_eq!(server.post(CONFIG_PATH, body.as_bytes()).status, 200);

    let cfg = ingest
        .await_submission(Some(Duration::from_millis(10)), Duration::from_millis(10))
        .unwrap();
    assert!(cfg.motion && cfg.fire && !cfg.sound && !cfg.gas);
    assert!(cfg.network_password.is_empty());
}

#[test]
fn unknown_routes_are_404() {
    let (server, _) = endpoint();
    assert_eq!(server.get("/api/config").status, 404);
    assert_eq!(server.post("/api/check", VALID.as_bytes()).status, 404);
}

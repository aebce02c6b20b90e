//! Provisioning HTTP endpoint.
//!
//! | Method | Path          | Handler                                   |
//! |--------|---------------|-------------------------------------------|
//! | GET    | `/api/check`  | [`ConfigurationIngestService::handle_check`]  |
//! | POST   | `/api/config` | [`ConfigurationIngestService::handle_config`] |
//!
//! On the device this is an `EspHttpServer`; the listener stops when the
//! returned [`ServerHandle`] is dropped.  The host build routes requests
//! in-process so tests can drive the same handlers.

use log::info;

#[cfg(not(target_os = "espidf"))]
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::app::ports::{NetworkError, ProvisioningEndpoint};
use crate::provisioning::{ConfigurationIngestService, HttpReply, MAX_CONFIG_BODY, ValidationError};

pub const CHECK_PATH: &str = "/api/check";
pub const CONFIG_PATH: &str = "/api/config";

/// Receive buffer for a request body of `len` bytes.
pub fn body_buffer(len: usize) -> Result<heapless::Vec<u8, MAX_CONFIG_BODY>, ValidationError> {
    let mut buf = heapless::Vec::new();
    buf.resize(len, 0)
        .map_err(|()| ValidationError::BodyTooLarge(len))?;
    Ok(buf)
}

/// Clones share one simulated listener table (host only).
#[cfg_attr(not(target_os = "espidf"), derive(Clone))]
pub struct HttpServerAdapter {
    stack_size: usize,
    #[cfg(not(target_os = "espidf"))]
    sim: Arc<Mutex<SimListeners>>,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimListeners {
    live: usize,
    fail_next: Option<String>,
}

impl Default for HttpServerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpServerAdapter {
    pub fn new() -> Self {
        Self {
            stack_size: 8 * 1024,
            #[cfg(not(target_os = "espidf"))]
            sim: Arc::default(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF server
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct ServerHandle {
    _server: esp_idf_svc::http::server::EspHttpServer<'static>,
}

#[cfg(target_os = "espidf")]
impl Drop for ServerHandle {
    fn drop(&mut self) {
        info!("HttpServer: listener stopped");
    }
}

#[cfg(target_os = "espidf")]
fn respond(
    req: esp_idf_svc::http::server::Request<&mut esp_idf_svc::http::server::EspHttpConnection<'_>>,
    reply: &HttpReply,
) -> anyhow::Result<()> {
    use embedded_svc::io::Write;

    req.into_response(
        reply.status,
        None,
        &[("Content-Type", "application/json; charset=utf-8")],
    )?
    .write_all(reply.body.as_bytes())?;
    Ok(())
}

#[cfg(target_os = "espidf")]
impl ProvisioningEndpoint for HttpServerAdapter {
    type Handle = ServerHandle;

    fn start(&mut self, service: ConfigurationIngestService) -> Result<ServerHandle, NetworkError> {
        use embedded_svc::http::Method;
        use embedded_svc::io::Read;
        use esp_idf_svc::http::server::{Configuration as HttpConfiguration, EspHttpServer};

        let http = |e: esp_idf_svc::sys::EspError| NetworkError::Http(e.to_string());
        let conf = HttpConfiguration {
            stack_size: self.stack_size,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&conf).map_err(http)?;

        let svc = service.clone();
        server
            .fn_handler::<anyhow::Error, _>(CHECK_PATH, Method::Get, move |req| {
                respond(req, &svc.handle_check())
            })
            .map_err(http)?;

        let svc = service;
        server
            .fn_handler::<anyhow::Error, _>(CONFIG_PATH, Method::Post, move |mut req| {
                let len = req.content_len().unwrap_or(0) as usize;
                let reply = match body_buffer(len) {
                    Ok(mut body) => {
                        req.read_exact(&mut body)?;
                        svc.handle_config(&body)
                    }
                    Err(e) => HttpReply::rejected(&e),
                };
                respond(req, &reply)
            })
            .map_err(http)?;

        info!("HttpServer: provisioning endpoint listening");
        Ok(ServerHandle { _server: server })
    }
}

// ───────────────────────────────────────────────────────────────
// Host routing
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn lock(sim: &Mutex<SimListeners>) -> MutexGuard<'_, SimListeners> {
    sim.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(not(target_os = "espidf"))]
impl HttpServerAdapter {
    /// Make the next `start` fail with this message.
    pub fn sim_fail_next(&self, message: &str) {
        lock(&self.sim).fail_next = Some(message.to_owned());
    }

    /// Handles started and not yet dropped.
    pub fn sim_live_listeners(&self) -> usize {
        lock(&self.sim).live
    }
}

/// In-process endpoint; requests are dispatched directly.
#[cfg(not(target_os = "espidf"))]
pub struct ServerHandle {
    service: ConfigurationIngestService,
    sim: Arc<Mutex<SimListeners>>,
}

#[cfg(not(target_os = "espidf"))]
impl ServerHandle {
    pub fn get(&self, path: &str) -> HttpReply {
        match path {
            CHECK_PATH => self.service.handle_check(),
            _ => not_found(),
        }
    }

    pub fn post(&self, path: &str, body: &[u8]) -> HttpReply {
        match path {
            CONFIG_PATH => match body_buffer(body.len()) {
                Ok(mut buf) => {
                    buf.copy_from_slice(body);
                    self.service.handle_config(&buf)
                }
                Err(e) => HttpReply::rejected(&e),
            },
            _ => not_found(),
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Drop for ServerHandle {
    fn drop(&mut self) {
        let mut sim = lock(&self.sim);
        sim.live = sim.live.saturating_sub(1);
        info!("HttpServer(sim): listener stopped");
    }
}

#[cfg(not(target_os = "espidf"))]
fn not_found() -> HttpReply {
    HttpReply {
        status: 404,
        body: serde_json::json!({"status": "error", "message": "Not found"}).to_string(),
    }
}

#[cfg(not(target_os = "espidf"))]
impl ProvisioningEndpoint for HttpServerAdapter {
    type Handle = ServerHandle;

    fn start(&mut self, service: ConfigurationIngestService) -> Result<ServerHandle, NetworkError> {
        let mut sim = lock(&self.sim);
        if let Some(msg) = sim.fail_next.take() {
            return Err(NetworkError::Http(msg));
        }
        sim.live += 1;
        info!(
            "HttpServer(sim): provisioning endpoint listening (stack {} B)",
            self.stack_size
        );
        Ok(ServerHandle {
            service,
            sim: Arc::clone(&self.sim),
        })
    }
}

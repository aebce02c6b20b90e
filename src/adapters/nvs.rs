//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`NvsBackend`] for the HazardWatch configuration record.
//!
//! # Backends
//!
//! - **`target_os = "espidf"`**: raw `nvs_flash_*` / `nvs_*` calls from
//!   `esp_idf_svc::sys`.  The namespace handle is held open between
//!   `open` and `close`.
//! - **all other targets**: an in-memory partition shared between clones
//!   of the adapter.  Writes are staged and only applied by `commit`, and
//!   init / commit failures can be injected for tests.

use crate::app::ports::{FlashInitError, NvsBackend, StorageError};
use log::info;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use std::ffi::CString;

#[cfg(target_os = "espidf")]
const OK: esp_err_t = ESP_OK as esp_err_t;
#[cfg(target_os = "espidf")]
const NOT_FOUND: esp_err_t = ESP_ERR_NVS_NOT_FOUND as esp_err_t;

#[cfg(not(target_os = "espidf"))]
use std::collections::{HashMap, VecDeque};
#[cfg(not(target_os = "espidf"))]
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ───────────────────────────────────────────────────────────────
// Simulation partition
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
enum SimValue {
    Str(String),
    U8(u8),
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimPartition {
    committed: HashMap<String, SimValue>,
    pending: HashMap<String, SimValue>,
    namespace: Option<String>,
    init_failures: VecDeque<FlashInitError>,
    init_calls: u32,
    erase_calls: u32,
    fail_next_commit: bool,
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

/// Clones share one simulated partition (host only).
#[cfg_attr(not(target_os = "espidf"), derive(Clone))]
pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    handle: Option<nvs_handle_t>,
    #[cfg(not(target_os = "espidf"))]
    sim: Arc<Mutex<SimPartition>>,
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl NvsAdapter {
    /// Create an adapter.  Flash is not touched until `flash_init`.
    pub fn new() -> Self {
        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Self {
            #[cfg(target_os = "espidf")]
            handle: None,
            #[cfg(not(target_os = "espidf"))]
            sim: Arc::new(Mutex::new(SimPartition::default())),
        }
    }

    #[cfg(target_os = "espidf")]
    fn handle(&self) -> Result<nvs_handle_t, StorageError> {
        self.handle.ok_or(StorageError::Closed)
    }

    #[cfg(target_os = "espidf")]
    fn c_key(key: &'static str) -> Result<CString, StorageError> {
        CString::new(key).map_err(|_| StorageError::ReadFailed(key))
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl NvsBackend for NvsAdapter {
    fn flash_init(&mut self) -> Result<(), FlashInitError> {
        // SAFETY: called from the boot task before any other NVS user exists.
        let ret = unsafe { nvs_flash_init() };
        if ret == OK {
            info!("NvsAdapter: ESP-IDF NVS initialised");
            Ok(())
        } else if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
            || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
        {
            Err(FlashInitError::NeedsErase(ret))
        } else {
            Err(FlashInitError::Fatal(ret))
        }
    }

    fn flash_erase(&mut self) -> Result<(), StorageError> {
        log::warn!("NVS: erasing flash partition");
        // SAFETY: see flash_init.
        let ret = unsafe { nvs_flash_erase() };
        if ret != OK {
            return Err(StorageError::EraseFailed(ret));
        }
        Ok(())
    }

    fn open(&mut self, namespace: &str) -> Result<(), StorageError> {
        let ns = CString::new(namespace)
            .map_err(|_| StorageError::OpenFailed(ESP_ERR_INVALID_ARG as esp_err_t))?;
        let mut handle: nvs_handle_t = 0;
        // SAFETY: `ns` outlives the call; `handle` is a valid out-pointer.
        let ret = unsafe { nvs_open(ns.as_ptr(), nvs_open_mode_t_NVS_READWRITE, &mut handle) };
        if ret != OK {
            return Err(StorageError::OpenFailed(ret));
        }
        self.handle = Some(handle);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            // SAFETY: handle came from a successful nvs_open and is closed once.
            unsafe { nvs_close(handle) };
        }
    }

    fn get_str(&self, key: &'static str) -> Result<Option<String>, StorageError> {
        let handle = self.handle()?;
        let c_key = Self::c_key(key)?;

        // First call: get size (including the NUL terminator).
        let mut size: usize = 0;
        let ret = unsafe { nvs_get_str(handle, c_key.as_ptr(), core::ptr::null_mut(), &mut size) };
        if ret == NOT_FOUND {
            return Ok(None);
        }
        if ret != OK || size == 0 {
            return Err(StorageError::ReadFailed(key));
        }

        let mut buf = vec![0u8; size];
        let ret = unsafe { nvs_get_str(handle, c_key.as_ptr(), buf.as_mut_ptr().cast(), &mut size) };
        if ret != OK {
            return Err(StorageError::ReadFailed(key));
        }
        buf.truncate(size.saturating_sub(1));
        String::from_utf8(buf).map(Some).map_err(|_| StorageError::ReadFailed(key))
    }

    fn set_str(&mut self, key: &'static str, value: &str) -> Result<(), StorageError> {
        let handle = self.handle()?;
        let c_key = Self::c_key(key)?;
        let c_value = CString::new(value).map_err(|_| StorageError::WriteFailed(key))?;
        let ret = unsafe { nvs_set_str(handle, c_key.as_ptr(), c_value.as_ptr()) };
        if ret != OK {
            return Err(StorageError::WriteFailed(key));
        }
        Ok(())
    }

    fn get_u8(&self, key: &'static str) -> Result<Option<u8>, StorageError> {
        let handle = self.handle()?;
        let c_key = Self::c_key(key)?;
        let mut value: u8 = 0;
        let ret = unsafe { nvs_get_u8(handle, c_key.as_ptr(), &mut value) };
        match ret {
            OK => Ok(Some(value)),
            NOT_FOUND => Ok(None),
            _ => Err(StorageError::ReadFailed(key)),
        }
    }

    fn set_u8(&mut self, key: &'static str, value: u8) -> Result<(), StorageError> {
        let handle = self.handle()?;
        let c_key = Self::c_key(key)?;
        let ret = unsafe { nvs_set_u8(handle, c_key.as_ptr(), value) };
        if ret != OK {
            return Err(StorageError::WriteFailed(key));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        let handle = self.handle()?;
        let ret = unsafe { nvs_commit(handle) };
        if ret != OK {
            return Err(StorageError::CommitFailed(ret));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl NvsAdapter {
    fn lock(&self) -> MutexGuard<'_, SimPartition> {
        self.sim.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    fn scoped_key(p: &SimPartition, key: &str) -> Result<String, StorageError> {
        p.namespace
            .as_deref()
            .map(|ns| Self::composite_key(ns, key))
            .ok_or(StorageError::Closed)
    }

    fn get(&self, key: &'static str) -> Result<Option<SimValue>, StorageError> {
        let p = self.lock();
        let k = Self::scoped_key(&p, key)?;
        Ok(p.pending.get(&k).or_else(|| p.committed.get(&k)).cloned())
    }

    fn put(&self, key: &'static str, value: SimValue) -> Result<(), StorageError> {
        let mut p = self.lock();
        let k = Self::scoped_key(&p, key)?;
        p.pending.insert(k, value);
        Ok(())
    }

    /// Queue `count` consecutive `flash_init` failures.
    pub fn sim_fail_inits(&self, failure: FlashInitError, count: usize) {
        let mut p = self.lock();
        p.init_failures.extend(core::iter::repeat_n(failure, count));
    }

    /// Make the next `commit` fail and discard the staged writes.
    pub fn sim_fail_next_commit(&self) {
        self.lock().fail_next_commit = true;
    }

    pub fn sim_init_calls(&self) -> u32 {
        self.lock().init_calls
    }

    pub fn sim_erase_calls(&self) -> u32 {
        self.lock().erase_calls
    }

    /// Write a committed string directly, bypassing the namespace handle.
    pub fn sim_put_str(&self, namespace: &str, key: &str, value: &str) {
        self.lock()
            .committed
            .insert(Self::composite_key(namespace, key), SimValue::Str(value.into()));
    }

    /// Write a committed u8 directly, bypassing the namespace handle.
    pub fn sim_put_u8(&self, namespace: &str, key: &str, value: u8) {
        self.lock()
            .committed
            .insert(Self::composite_key(namespace, key), SimValue::U8(value));
    }
}

#[cfg(not(target_os = "espidf"))]
impl NvsBackend for NvsAdapter {
    fn flash_init(&mut self) -> Result<(), FlashInitError> {
        let mut p = self.lock();
        p.init_calls += 1;
        match p.init_failures.pop_front() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn flash_erase(&mut self) -> Result<(), StorageError> {
        let mut p = self.lock();
        p.erase_calls += 1;
        p.committed.clear();
        p.pending.clear();
        info!("NvsAdapter(sim): partition erased");
        Ok(())
    }

    fn open(&mut self, namespace: &str) -> Result<(), StorageError> {
        self.lock().namespace = Some(namespace.into());
        Ok(())
    }

    fn close(&mut self) {
        let mut p = self.lock();
        p.pending.clear();
        p.namespace = None;
    }

    fn get_str(&self, key: &'static str) -> Result<Option<String>, StorageError> {
        match self.get(key)? {
            Some(SimValue::Str(s)) => Ok(Some(s)),
            Some(SimValue::U8(_)) => Err(StorageError::ReadFailed(key)),
            None => Ok(None),
        }
    }

    fn set_str(&mut self, key: &'static str, value: &str) -> Result<(), StorageError> {
        self.put(key, SimValue::Str(value.into()))
    }

    fn get_u8(&self, key: &'static str) -> Result<Option<u8>, StorageError> {
        match self.get(key)? {
            Some(SimValue::U8(v)) => Ok(Some(v)),
            Some(SimValue::Str(_)) => Err(StorageError::ReadFailed(key)),
            None => Ok(None),
        }
    }

    fn set_u8(&mut self, key: &'static str, value: u8) -> Result<(), StorageError> {
        self.put(key, SimValue::U8(value))
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        let mut p = self.lock();
        if p.namespace.is_none() {
            return Err(StorageError::Closed);
        }
        if core::mem::take(&mut p.fail_next_commit) {
            p.pending.clear();
            return Err(StorageError::CommitFailed(-1));
        }
        let staged: Vec<_> = p.pending.drain().collect();
        p.committed.extend(staged);
        Ok(())
    }
}

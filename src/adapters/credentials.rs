//! Network credentials persisted in NVS.
//!
//! Stored as a postcard blob under namespace `wifi`, key `creds`.  The
//! dashboard sink owns a [`CredentialStore`] so `forget_wifi` can erase
//! them.

use heapless::String;
use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::StoragePort;
use crate::error::StorageError;

use super::utils::is_printable_ascii;

pub const CRED_NAMESPACE: &str = "wifi";
pub const CRED_KEY: &str = "creds";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCredentials {
    pub ssid: String<32>,
    pub password: String<64>,
}

impl NetworkCredentials {
    /// `None` if either field is too long or not printable ASCII.
    pub fn new(ssid: &str, password: &str) -> Option<Self> {
        if ssid.is_empty() || !is_printable_ascii(ssid) || !is_printable_ascii(password) {
            return None;
        }
        Some(Self {
            ssid: String::try_from(ssid).ok()?,
            password: String::try_from(password).ok()?,
        })
    }
}

pub trait CredentialStore {
    fn load(&self) -> Result<NetworkCredentials, StorageError>;
    fn save(&mut self, creds: &NetworkCredentials) -> Result<(), StorageError>;
    fn clear(&mut self) -> Result<(), StorageError>;
}

pub struct NvsCredentialStore<S: StoragePort> {
    storage: S,
}

impl<S: StoragePort> NvsCredentialStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: StoragePort> CredentialStore for NvsCredentialStore<S> {
    fn load(&self) -> Result<NetworkCredentials, StorageError> {
        let mut buf = [0u8; 128];
        let len = self.storage.read(CRED_NAMESPACE, CRED_KEY, &mut buf)?;
        let creds: NetworkCredentials =
            postcard::from_bytes(&buf[..len]).map_err(|_| StorageError::Corrupted)?;
        if !is_printable_ascii(&creds.ssid) || !is_printable_ascii(&creds.password) {
            return Err(StorageError::Corrupted);
        }
        Ok(creds)
    }

    fn save(&mut self, creds: &NetworkCredentials) -> Result<(), StorageError> {
        let mut buf = [0u8; 128];
        let bytes = postcard::to_slice(creds, &mut buf).map_err(|_| StorageError::Full)?;
        self.storage.write(CRED_NAMESPACE, CRED_KEY, bytes)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.storage.delete(CRED_NAMESPACE, CRED_KEY)?;
        info!("Credentials: cleared");
        Ok(())
    }
}

//! Keychain storage for the remote session cookies of a profile.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "auri-cli";

#[derive(Debug, Clone)]
pub struct CookieVault {
    username: String,
}

impl CookieVault {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("appwrite_cookies:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> Result<Entry, CliError> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| CliError::SecureStorage(error.to_string()))
    }

    #[cfg(not(test))]
    pub fn load(&self) -> Result<Option<String>, CliError> {
        match self.entry()?.get_password() {
            Ok(cookies) => Ok(Some(cookies)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(CliError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn load(&self) -> Result<Option<String>, CliError> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::SecureStorage(error.to_string()))?;
        Ok(guard.get(&self.username).cloned())
    }

    #[cfg(not(test))]
    pub fn save(&self, cookies: &str) -> Result<(), CliError> {
        self.entry()?
            .set_password(cookies)
            .map_err(|error| CliError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    pub fn save(&self, cookies: &str) -> Result<(), CliError> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), cookies.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    pub fn clear(&self) -> Result<(), CliError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(CliError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn clear(&self) -> Result<(), CliError> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

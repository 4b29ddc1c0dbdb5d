use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;

use crate::expiry;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DbError {
    #[error("invalid ttl value")]
    InvalidTtl,
    #[error("key not found")]
    KeyNotFound,
    #[error("wrong type")]
    WrongType,
    #[error("no items")]
    NoItems,
}

/// In-memory key-value store holding scalar, list and dict values.
///
/// Cloning is cheap and every clone shares the same map. Reads take a shared
/// lock and mutations take an exclusive one; no lock is held across an await.
#[derive(Debug, Clone, Default)]
pub struct Store {
    data: Arc<RwLock<HashMap<String, Value>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` as a scalar, replacing whatever the key held before.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        tracing::debug!(key = %key, "set");
        self.data.write().insert(key, Value::Scalar(value.into()));
    }

    pub fn get(&self, key: &str) -> Result<String, DbError> {
        let data = self.data.read();
        let value = data.get(key).ok_or(DbError::KeyNotFound)?;
        value.as_scalar().map(str::to_owned)
    }

    /// Deletes the key. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) {
        if let Some(old) = self.data.write().remove(key) {
            tracing::debug!(key, kind = old.kind(), "removed");
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Arms a one-shot removal of `key` after `ttl_ms` milliseconds.
    ///
    /// A zero TTL does nothing. Timers are not cancellable and are not
    /// de-duplicated: calling this twice arms two removals, and the earlier
    /// one still fires even if a longer TTL was set after it.
    pub fn set_ttl(&self, key: &str, ttl_ms: i64) -> Result<(), DbError> {
        if ttl_ms < 0 {
            return Err(DbError::InvalidTtl);
        }
        if ttl_ms == 0 {
            return Ok(());
        }
        if !self.data.read().contains_key(key) {
            return Err(DbError::KeyNotFound);
        }

        let delay = Duration::from_millis(ttl_ms.unsigned_abs());
        let store = self.clone();
        let key = key.to_owned();
        tracing::debug!(key = %key, ttl_ms, "expiration armed");
        expiry::schedule(delay, move || {
            tracing::debug!(key = %key, "ttl elapsed");
            store.remove(&key);
        });

        Ok(())
    }

    /// Appends `values` to the list at `key`, creating it when absent.
    pub fn push<I, S>(&self, key: &str, values: I) -> Result<(), DbError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut data = self.data.write();
        let values = values.into_iter().map(Into::into);
        match data.get_mut(key) {
            Some(existing) => existing.as_list_mut()?.extend(values),
            None => {
                data.insert(key.to_owned(), Value::List(values.collect::<VecDeque<_>>()));
            }
        }
        Ok(())
    }

    /// Removes and returns the first element of the list at `key`.
    pub fn pop(&self, key: &str) -> Result<String, DbError> {
        let mut data = self.data.write();
        let list = data
            .get_mut(key)
            .ok_or(DbError::KeyNotFound)?
            .as_list_mut()?;
        list.pop_front().ok_or(DbError::NoItems)
    }

    pub fn hset(
        &self,
        key: &str,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DbError> {
        let mut data = self.data.write();
        match data.get_mut(key) {
            Some(existing) => {
                existing.as_dict_mut()?.insert(field.into(), value.into());
            }
            None => {
                let dict = HashMap::from([(field.into(), value.into())]);
                data.insert(key.to_owned(), Value::Dict(dict));
            }
        }
        Ok(())
    }

    /// Returns the dict field, or an empty string when the field is unset.
    /// Only a missing key is an error.
    pub fn hget(&self, key: &str, field: &str) -> Result<String, DbError> {
        let data = self.data.read();
        let dict = data.get(key).ok_or(DbError::KeyNotFound)?.as_dict()?;
        Ok(dict.get(field).cloned().unwrap_or_default())
    }
}

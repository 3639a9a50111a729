use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{FeedClientError, FeedClientResult};
use crate::models::AuthTokens;

/// Ключ access token в хранилище.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Ключ refresh token в хранилище.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Долговременное key-value хранилище учётных данных.
pub trait TokenStore: Send + Sync {
    /// Читает значение по ключу.
    fn get(&self, key: &str) -> Option<String>;
    /// Записывает значение.
    fn set(&self, key: &str, value: &str) -> FeedClientResult<()>;
    /// Удаляет значение.
    fn remove(&self, key: &str) -> FeedClientResult<()>;
}

fn parse_token(raw: &str) -> Option<String> {
    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

pub(crate) fn load_tokens(store: &dyn TokenStore) -> Option<AuthTokens> {
    Some(AuthTokens {
        access_token: store.get(ACCESS_TOKEN_KEY)?,
        refresh_token: store.get(REFRESH_TOKEN_KEY)?,
    })
}

pub(crate) fn save_tokens(store: &dyn TokenStore, tokens: &AuthTokens) -> FeedClientResult<()> {
    store.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
    store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)
}

pub(crate) fn clear_tokens(store: &dyn TokenStore) -> FeedClientResult<()> {
    store.remove(ACCESS_TOKEN_KEY)?;
    store.remove(REFRESH_TOKEN_KEY)
}

#[derive(Debug, Default)]
/// Хранилище в памяти процесса.
pub struct MemoryTokenStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    /// Пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key).and_then(|raw| parse_token(raw))
    }

    fn set(&self, key: &str, value: &str) -> FeedClientResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> FeedClientResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

#[derive(Debug)]
/// Хранилище в JSON-файле (`{"accessToken": "...", "refreshToken": "..."}`).
///
/// Файл перечитывается при каждом обращении, поэтому несколько процессов
/// CLI видят актуальные токены.
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Хранилище по указанному пути. Файл создаётся при первой записи.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Путь к файлу.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> FeedClientResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path).map_err(|err| {
            FeedClientError::Storage(format!("read {}: {err}", self.path.display()))
        })?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    // Испорченный файл перезаписывается с нуля, но не молча.
    fn read_for_update(&self) -> BTreeMap<String, String> {
        self.read_all().unwrap_or_else(|err| {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "token file is unreadable, overwriting"
            );
            BTreeMap::new()
        })
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> FeedClientResult<()> {
        if values.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(|err| {
                    FeedClientError::Storage(format!("remove {}: {err}", self.path.display()))
                })?;
            }
            return Ok(());
        }
        let raw = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, raw).map_err(|err| {
            FeedClientError::Storage(format!("write {}: {err}", self.path.display()))
        })
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.read_all() {
            Ok(values) => values.get(key).and_then(|raw| parse_token(raw)),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "token file is unreadable");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> FeedClientResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read_for_update();
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> FeedClientResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read_for_update();
        values.remove(key);
        self.write_all(&values)
    }
}

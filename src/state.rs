//! Small observable UI stores.
//!
//! Each store owns exactly one value behind a `watch` channel; there is no
//! shared global store. The language store persists its value through a
//! [`PreferenceStorage`] so the selection survives restarts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::errors::StorefrontError;
use crate::i18n::Language;

const APP_DIR: &str = "esim-storefront";
const PREFERENCES_FILE: &str = "preferences.json";
const LANGUAGE_KEY: &str = "language";

/// Persistent string key/value storage for client preferences.
pub trait PreferenceStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorefrontError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorefrontError>;
    fn remove(&self, key: &str) -> Result<(), StorefrontError>;
}

/// Non-persistent storage, for tests and server-side rendering.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    fn values(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorefrontError> {
        self.values
            .lock()
            .map_err(|_| StorefrontError::Storage("preference lock poisoned".to_string()))
    }
}

impl PreferenceStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorefrontError> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorefrontError> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorefrontError> {
        self.values()?.remove(key);
        Ok(())
    }
}

/// JSON file of string preferences.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<data dir>/esim-storefront/preferences.json`, if the platform has a data dir.
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|mut path| {
            path.push(APP_DIR);
            path.push(PREFERENCES_FILE);
            Self::new(path)
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StorefrontError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|err| StorefrontError::Storage(err.to_string()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|err| StorefrontError::Storage(err.to_string()))
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), StorefrontError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| StorefrontError::Storage(err.to_string()))?;
        }
        let contents = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, contents).map_err(|err| StorefrontError::Storage(err.to_string()))
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StorefrontError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StorefrontError::Storage("preference lock poisoned".to_string()))?;
        let mut values = self.read()?;
        apply(&mut values);
        self.write(&values)
    }
}

impl PreferenceStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorefrontError> {
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorefrontError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorefrontError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// Selected UI language.
///
/// Starts from the persisted choice, else the OS locale, else English.
#[derive(Clone)]
pub struct LanguageStore {
    tx: Arc<watch::Sender<Language>>,
    storage: Arc<dyn PreferenceStorage>,
}

impl std::fmt::Debug for LanguageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageStore").field("language", &self.get()).finish()
    }
}

impl LanguageStore {
    pub fn load(storage: Arc<dyn PreferenceStorage>) -> Self {
        Self::load_with_default(storage, Language::detect().unwrap_or_default())
    }

    /// Like [`LanguageStore::load`] with an explicit default instead of the OS locale.
    pub fn load_with_default(storage: Arc<dyn PreferenceStorage>, default: Language) -> Self {
        let persisted = match storage.get(LANGUAGE_KEY) {
            Ok(value) => value.and_then(|code| Language::from_locale_tag(&code)),
            Err(err) => {
                tracing::warn!(error = %err, "could not read persisted language");
                None
            }
        };

        let (tx, _rx) = watch::channel(persisted.unwrap_or(default));
        Self {
            tx: Arc::new(tx),
            storage,
        }
    }

    pub fn get(&self) -> Language {
        *self.tx.borrow()
    }

    /// Selects and persists `language`. Subscribers see the change even if
    /// persisting fails.
    pub fn set(&self, language: Language) -> Result<(), StorefrontError> {
        self.tx.send_replace(language);
        self.storage.set(LANGUAGE_KEY, language.code())
    }

    /// Forgets the persisted choice and returns to `default`.
    pub fn reset(&self, default: Language) -> Result<(), StorefrontError> {
        self.tx.send_replace(default);
        self.storage.remove(LANGUAGE_KEY)
    }

    pub fn subscribe(&self) -> watch::Receiver<Language> {
        self.tx.subscribe()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertState {
    pub alert: Option<Alert>,
    pub visible: bool,
}

/// Transient alert banner: one active alert and a visibility flag.
#[derive(Debug, Clone)]
pub struct AlertStore {
    tx: Arc<watch::Sender<AlertState>>,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AlertState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> AlertState {
        self.tx.borrow().clone()
    }

    /// Replaces any active alert.
    pub fn show(&self, kind: AlertKind, message: impl Into<String>) {
        self.tx.send_replace(AlertState {
            alert: Some(Alert {
                kind,
                message: message.into(),
            }),
            visible: true,
        });
    }

    /// Hides the banner but keeps its content so it can animate out.
    pub fn hide(&self) {
        self.tx.send_modify(|state| state.visible = false);
    }

    pub fn clear(&self) {
        self.tx.send_replace(AlertState::default());
    }

    pub fn subscribe(&self) -> watch::Receiver<AlertState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(PREFERENCES_FILE);

        let store = LanguageStore::load_with_default(Arc::new(FileStorage::new(&path)), Language::En);
        assert_eq!(store.get(), Language::En);
        store.set(Language::Fr).unwrap();

        let reloaded = LanguageStore::load_with_default(Arc::new(FileStorage::new(&path)), Language::En);
        assert_eq!(reloaded.get(), Language::Fr);

        reloaded.reset(Language::De).unwrap();
        assert_eq!(reloaded.get(), Language::De);
        let again = LanguageStore::load_with_default(Arc::new(FileStorage::new(&path)), Language::Es);
        assert_eq!(again.get(), Language::Es);
    }

    #[test]
    fn unsupported_persisted_value_uses_default() {
        let storage = Arc::new(MemoryStorage::default());
        storage.set(LANGUAGE_KEY, "klingon").unwrap();
        let store = LanguageStore::load_with_default(storage, Language::De);
        assert_eq!(store.get(), Language::De);
    }

    #[tokio::test]
    async fn language_subscribers_observe_changes() {
        let store = LanguageStore::load_with_default(Arc::new(MemoryStorage::default()), Language::En);
        let mut rx = store.subscribe();
        store.set(Language::Ar).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Language::Ar);
    }

    #[test]
    fn alert_show_hide_clear() {
        let alerts = AlertStore::new();
        assert_eq!(alerts.current(), AlertState::default());

        alerts.show(AlertKind::Error, "Payment failed");
        alerts.show(AlertKind::Success, "Ticket created");
        let state = alerts.current();
        assert!(state.visible);
        assert_eq!(state.alert.as_ref().map(|a| a.kind), Some(AlertKind::Success));

        alerts.hide();
        let hidden = alerts.current();
        assert!(!hidden.visible);
        assert_eq!(hidden.alert.map(|a| a.message), Some("Ticket created".to_string()));

        alerts.clear();
        assert_eq!(alerts.current(), AlertState::default());
    }
}

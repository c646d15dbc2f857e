//! Shared execution context for one pipeline run.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Engine-constructed state passed to every unit of a run.
///
/// Units borrow it mutably for the duration of one call. State that one
/// unit produces for a later one goes into the value bag (serializable) or
/// the extension map (anything `'static`), never into unit fields.
pub struct ExecutionContext {
    subject: String,
    run_id: String,
    started_at: DateTime<Utc>,
    values: HashMap<String, serde_json::Value>,
    extensions: HashMap<TypeId, Box<dyn Any>>,
}

impl ExecutionContext {
    /// Create a context for processing `subject`.
    pub fn new(subject: impl Into<String>) -> Self {
        let started_at = Utc::now();
        Self {
            subject: subject.into(),
            run_id: started_at.format("%Y%m%dT%H%M%S%.3fZ").to_string(),
            started_at,
            values: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    /// Override the generated run id.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// The thing being processed (a scene, a file, a target name).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// When the context was created.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Store a serializable value under `key`.
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> anyhow::Result<()> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Raw JSON value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Deserialize the value stored under `key`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.values.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Remove and return the value stored under `key`.
    pub fn take(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    /// All stored values.
    pub fn values(&self) -> &HashMap<String, serde_json::Value> {
        &self.values
    }

    /// Store a typed extension, replacing any previous one of the same type.
    pub fn insert_extension<T: Any>(&mut self, value: T) -> Option<T> {
        self.extensions
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Borrow a typed extension.
    pub fn extension<T: Any>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Mutably borrow a typed extension.
    pub fn extension_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut::<T>())
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("subject", &self.subject)
            .field("run_id", &self.run_id)
            .field("started_at", &self.started_at)
            .field("values", &self.values)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

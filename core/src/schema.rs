//! Runtime shapes, the response envelope and the envelope cache.
//!
//! # Design
//! A `Shape` is a type-erased validator with a process-unique identity.
//! Clones share the identity, so a registry can hand the same shape to
//! many calls. The cache maps that identity to the wrapped envelope
//! validator; entries are never evicted, the number of entries is bounded
//! by the distinct shapes an application declares.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ValidationError;

static NEXT_SHAPE_ID: AtomicU64 = AtomicU64::new(1);

type Check = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

struct ShapeInner {
    id: u64,
    name: String,
    check: Box<Check>,
}

/// A declared JSON shape.
#[derive(Clone)]
pub struct Shape(Arc<ShapeInner>);

impl Shape {
    /// Accepts any JSON value that deserializes into `T`.
    pub fn of<T: DeserializeOwned + 'static>() -> Self {
        Self::custom(type_name::<T>(), |value| {
            T::deserialize(value).map(|_| ()).map_err(|e| e.to_string())
        })
    }

    /// Accepts every JSON value.
    pub fn any() -> Self {
        Self::custom("any", |_| Ok(()))
    }

    pub fn custom(
        name: impl Into<String>,
        check: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(ShapeInner {
            id: NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            check: Box::new(check),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        (self.0.check)(value).map_err(|reason| ValidationError::new(self.name(), reason))
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .finish()
    }
}

/// A validated response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Value),
    Failure { message: String, code: Option<String> },
}

/// Validator for `{"success": true, "data": ..}` / `{"success": false, "message": ..}`
/// where `data` must match the wrapped output shape.
#[derive(Debug)]
pub struct EnvelopeShape {
    output: Shape,
}

impl EnvelopeShape {
    pub fn new(output: Shape) -> Self {
        Self { output }
    }

    pub fn output(&self) -> &Shape {
        &self.output
    }

    pub fn validate(&self, value: Value) -> Result<Envelope, ValidationError> {
        let shape = format!("Envelope<{}>", self.output.name());
        let Value::Object(mut fields) = value else {
            return Err(ValidationError::new(shape, "expected an object"));
        };
        let success = match fields.get("success") {
            Some(Value::Bool(success)) => *success,
            Some(_) => return Err(ValidationError::new(shape, "`success` must be a boolean")),
            None => return Err(ValidationError::new(shape, "missing field `success`")),
        };
        if success {
            let data = fields
                .remove("data")
                .ok_or_else(|| ValidationError::new(&shape, "missing field `data`"))?;
            self.output.validate(&data)?;
            return Ok(Envelope::Success(data));
        }
        let message = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(_) => return Err(ValidationError::new(shape, "`message` must be a string")),
            None => return Err(ValidationError::new(shape, "missing field `message`")),
        };
        let code = match fields.remove("code") {
            Some(Value::String(code)) => Some(code),
            _ => None,
        };
        Ok(Envelope::Failure { message, code })
    }
}

/// Memoized mapping from output shape identity to its envelope validator.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: Mutex<HashMap<u64, Arc<EnvelopeShape>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache, created on first use.
    pub fn shared() -> Arc<SchemaCache> {
        static SHARED: OnceLock<Arc<SchemaCache>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(SchemaCache::new())).clone()
    }

    /// Return the envelope validator for `output`, creating it on first use.
    /// The lookup and insert happen under one lock, so the same shape
    /// always yields the same `Arc`.
    pub fn envelope_for(&self, output: &Shape) -> Arc<EnvelopeShape> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(output.id())
            .or_insert_with(|| Arc::new(EnvelopeShape::new(output.clone())))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Metadata Registry - Extract record metadata once per type
//!
//! Sessions look up a record type's [`RecordMetadata`] here instead of
//! re-validating its declarations. A registry can be owned and passed to
//! builders explicitly; [`MetadataRegistry::global`] is the process-wide one
//! used by `build()`.
//!
//! Thread safety: lookups take a read lock. On a miss the metadata is
//! extracted outside any lock and inserted only if no other thread got there
//! first, so concurrent population is idempotent and every caller sees the
//! same `Arc`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::error::{BindingError, BindingResult};
use crate::logs::log_info;
use crate::meta::{Record, RecordMetadata};

static GLOBAL_REGISTRY: Lazy<MetadataRegistry> = Lazy::new(MetadataRegistry::new);

type Entry = Arc<dyn Any + Send + Sync>;

/// Registry of extracted record metadata, keyed by record type.
#[derive(Default)]
pub struct MetadataRegistry {
    entries: RwLock<HashMap<TypeId, Entry>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> &'static MetadataRegistry {
        &GLOBAL_REGISTRY
    }

    /// Get the metadata of `R`, extracting it on first use.
    ///
    /// Extraction failures are not cached: every call for an invalid record
    /// type reports the binding error again.
    pub fn metadata<R: Record>(&self) -> BindingResult<Arc<RecordMetadata<R>>> {
        let key = TypeId::of::<R>();

        if let Some(entry) = self.read().get(&key).cloned() {
            return downcast::<R>(entry);
        }

        let extracted: Entry = Arc::new(RecordMetadata::<R>::extract()?);
        let entry = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(key).or_insert(extracted))
        };

        let metadata = downcast::<R>(entry)?;
        log_info(format!(
            "Column metadata for {}: {} binding(s)",
            metadata.record_name(),
            metadata.len()
        ));
        Ok(metadata)
    }

    /// Whether metadata of `R` has been extracted
    pub fn contains<R: Record>(&self) -> bool {
        self.read().contains_key(&TypeId::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all extracted metadata. Sessions already holding an `Arc` keep it.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeId, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn downcast<R: Record>(entry: Entry) -> BindingResult<Arc<RecordMetadata<R>>> {
    entry
        .downcast::<RecordMetadata<R>>()
        .map_err(|_| BindingError::InvalidBinding {
            record: R::record_name(),
            field: String::new(),
            reason: "registry entry has an unexpected type".into(),
        })
}

//! The chain registry: operation name to stage factory.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use datapipe_types::{short_type_name, PipeError, PipeResult};

use crate::config::{DuplicatePolicy, RegistryConfig};
use crate::producer::{BoxProducer, Producer};

use super::args::ChainArgs;

/// A stage factory for one item/output type pair.
pub type ChainFactory<T, U> =
    Arc<dyn Fn(BoxProducer<T>, ChainArgs) -> PipeResult<BoxProducer<U>> + Send + Sync>;

static GLOBAL: OnceLock<ChainRegistry> = OnceLock::new();

struct ChainEntry {
    description: String,
    signature: String,
    /// A `ChainFactory<T, U>`, recovered by downcast at build time.
    factory: Arc<dyn Any + Send + Sync>,
}

/// Help-facing summary of a registered operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainInfo {
    /// Operation name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// `Item -> Output`, using bare type names.
    pub signature: String,
}

/// Registry of chainable operations.
pub struct ChainRegistry {
    entries: RwLock<HashMap<String, ChainEntry>>,
    on_duplicate: DuplicatePolicy,
}

impl ChainRegistry {
    /// Create an empty registry with default settings.
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    /// Create an empty registry with the given settings.
    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            on_duplicate: config.on_duplicate,
        }
    }

    /// The process-wide registry used by [`ProducerExt::chain`](crate::ProducerExt::chain).
    pub fn global() -> &'static ChainRegistry {
        GLOBAL.get_or_init(ChainRegistry::new)
    }

    /// Configure the process-wide registry.
    ///
    /// Only effective before anything has touched [`global`](Self::global).
    /// Returns false if the registry already existed.
    pub fn install_global(config: &RegistryConfig) -> bool {
        let installed = GLOBAL.set(ChainRegistry::with_config(config)).is_ok();
        if !installed {
            tracing::debug!("global chain registry already initialized, config ignored");
        }
        installed
    }

    /// Register `factory` under `name`.
    ///
    /// If `name` is taken, the configured [`DuplicatePolicy`] decides: the new
    /// factory replaces the old one (with a warning), or registration fails.
    pub fn register<T, U, F>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        factory: F,
    ) -> PipeResult<()>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: Fn(BoxProducer<T>, ChainArgs) -> PipeResult<BoxProducer<U>> + Send + Sync + 'static,
    {
        let name = name.into();
        let factory: ChainFactory<T, U> = Arc::new(factory);
        let entry = ChainEntry {
            description: description.into(),
            signature: format!("{} -> {}", short_type_name::<T>(), short_type_name::<U>()),
            factory: Arc::new(factory),
        };

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = entries.get(&name) {
            match self.on_duplicate {
                DuplicatePolicy::Reject => return Err(PipeError::DuplicateOperation(name)),
                DuplicatePolicy::Replace => {
                    tracing::warn!(
                        operation = %name,
                        old = %existing.signature,
                        new = %entry.signature,
                        "replacing registered chain operation"
                    );
                }
            }
        }
        entries.insert(name, entry);
        Ok(())
    }

    /// Remove `name`. Returns true if it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(name).is_some()
    }

    /// Check whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(name)
    }

    /// Look up the factory for `name`, typed on item and output.
    pub fn resolve<T, U>(&self, name: &str) -> PipeResult<ChainFactory<T, U>>
    where
        T: Send + 'static,
        U: Send + 'static,
    {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .get(name)
            .ok_or_else(|| PipeError::NoSuchOperation(name.to_string()))?;

        entry
            .factory
            .downcast_ref::<ChainFactory<T, U>>()
            .cloned()
            .ok_or_else(|| PipeError::ChainSignature {
                name: name.to_string(),
                expected: format!("{} -> {}", type_name::<T>(), type_name::<U>()),
            })
    }

    /// Build the stage `name` on top of `upstream`.
    pub fn build<T, U>(
        &self,
        name: &str,
        upstream: BoxProducer<T>,
        args: ChainArgs,
    ) -> PipeResult<BoxProducer<U>>
    where
        T: Send + 'static,
        U: Send + 'static,
    {
        // The lock is released before the factory runs; factories may register.
        let factory = self.resolve::<T, U>(name)?;
        tracing::trace!(operation = name, upstream = %upstream.describe(), "building chained stage");
        factory(upstream, args.for_op(name))
    }

    /// Description of `name`, if registered.
    pub fn describe(&self, name: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(name).map(|e| e.description.clone())
    }

    /// Every registered operation, sorted by name.
    pub fn list(&self) -> Vec<ChainInfo> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut infos: Vec<ChainInfo> = entries
            .iter()
            .map(|(name, entry)| ChainInfo {
                name: name.clone(),
                description: entry.description.clone(),
                signature: entry.signature.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Render a help listing, one operation per line.
    pub fn help(&self) -> String {
        let infos = self.list();
        let width = infos.iter().map(|i| i.name.len()).max().unwrap_or(0);
        infos
            .iter()
            .map(|i| format!("  {:width$}  {}  ({})", i.name, i.description, i.signature))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Type registry
//!
//! Maps type descriptors (and display names) to published [`TypeRecord`]s.
//! A `Registry` is an ordinary value that can be passed around explicitly;
//! a process-wide instance is available through [`Registry::global`].

use std::any::Any;
use std::sync::{Arc, OnceLock};

use log::{debug, warn};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::config::RegistryConfig;
use crate::error::{ReflectError, ReflectResult};
use crate::record::{TypeBuilder, TypeRecord};
use crate::type_desc::TypeDesc;

static GLOBAL: OnceLock<RwLock<Registry>> = OnceLock::new();

/// Catalog of registered types
#[derive(Debug, Default)]
pub struct Registry {
    config: RegistryConfig,
    records: FxHashMap<TypeDesc, Arc<TypeRecord>>,
    names: FxHashMap<String, TypeDesc>,
}

impl Registry {
    /// Create an empty registry with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Active configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The process-wide registry, created on first use
    pub fn global() -> &'static RwLock<Registry> {
        GLOBAL.get_or_init(|| RwLock::new(Registry::new()))
    }

    /// Configure the process-wide registry
    ///
    /// Returns `false` if it was already initialized, in which case the
    /// configuration is not applied.
    pub fn init_global(config: RegistryConfig) -> bool {
        GLOBAL.set(RwLock::new(Registry::with_config(config))).is_ok()
    }

    /// Start registering `T` under a display name
    pub fn register<T: Any>(&mut self, name: &str) -> TypeBuilder<'_, T> {
        TypeBuilder::new(self, name)
    }

    pub(crate) fn insert(&mut self, record: TypeRecord) -> ReflectResult<Arc<TypeRecord>> {
        let ty = record.class_type();
        if let Some(previous) = self.records.get(&ty) {
            if !self.config.replace_existing {
                return Err(ReflectError::AlreadyRegistered(previous.name().to_string()));
            }
            warn!("Type {} re-registered as {}", previous.name(), record.name());
            let old_name = previous.name().to_string();
            self.names.remove(&old_name);
        }
        if let Some(other) = self.names.get(record.name()).copied() {
            if other != ty {
                warn!(
                    "Display name {} moved from {} to {}",
                    record.name(),
                    other,
                    ty
                );
            }
        }

        debug!(
            "Published {} ({}): {} member(s), {} callable name(s)",
            record.name(),
            ty,
            record.member_table().len(),
            record.callable_table().len()
        );
        let record = Arc::new(record);
        self.names.insert(record.name().to_string(), ty);
        self.records.insert(ty, Arc::clone(&record));
        Ok(record)
    }

    /// Record for a type descriptor
    pub fn lookup(&self, ty: TypeDesc) -> ReflectResult<Arc<TypeRecord>> {
        self.records
            .get(&ty)
            .cloned()
            .ok_or_else(|| ReflectError::NotRegistered(ty.name().to_string()))
    }

    /// Record for `T`
    pub fn lookup_type<T: Any>(&self) -> ReflectResult<Arc<TypeRecord>> {
        self.lookup(TypeDesc::of::<T>())
    }

    /// Record for a display name
    pub fn lookup_by_name(&self, name: &str) -> ReflectResult<Arc<TypeRecord>> {
        self.names
            .get(name)
            .and_then(|ty| self.records.get(ty))
            .cloned()
            .ok_or_else(|| ReflectError::NotRegistered(name.to_string()))
    }

    /// Check if `ty` has a record
    pub fn contains(&self, ty: TypeDesc) -> bool {
        self.records.contains_key(&ty)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Display names, unordered
    pub fn type_names(&self) -> Vec<&str> {
        self.names.keys().map(String::as_str).collect()
    }
}

/// Register a type in the process-wide registry
///
/// The global write lock is held while `configure` runs, so the closure must
/// not call [`lookup_global`] or any other global helper; that deadlocks.
///
/// ```ignore
/// register_global::<Vector3>("Vector3", |b| b.member("x", field!(Vector3, x)))?;
/// ```
pub fn register_global<T: Any>(
    name: &str,
    configure: impl FnOnce(TypeBuilder<'_, T>) -> TypeBuilder<'_, T>,
) -> ReflectResult<Arc<TypeRecord>> {
    let mut registry = Registry::global().write();
    let builder = configure(registry.register::<T>(name));
    builder.publish()
}

/// Look up a type in the process-wide registry
pub fn lookup_global(ty: TypeDesc) -> ReflectResult<Arc<TypeRecord>> {
    Registry::global().read().lookup(ty)
}

/// Look up a display name in the process-wide registry
pub fn lookup_global_by_name(name: &str) -> ReflectResult<Arc<TypeRecord>> {
    Registry::global().read().lookup_by_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_register_and_lookup() {
        init_logger();
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        let record = registry.register::<Alpha>("Alpha").publish().unwrap();
        assert_eq!(record.name(), "Alpha");
        assert!(registry.contains(TypeDesc::of::<Alpha>()));
        assert_eq!(registry.len(), 1);

        let by_type = registry.lookup_type::<Alpha>().unwrap();
        let by_name = registry.lookup_by_name("Alpha").unwrap();
        assert!(Arc::ptr_eq(&by_type, &by_name));
    }

    #[test]
    fn test_not_registered() {
        let registry = Registry::new();
        assert!(matches!(
            registry.lookup_type::<Beta>(),
            Err(ReflectError::NotRegistered(_))
        ));
        assert_eq!(
            registry.lookup_by_name("Beta").unwrap_err(),
            ReflectError::NotRegistered("Beta".to_string())
        );
    }

    #[test]
    fn test_replace_existing() {
        init_logger();
        let mut registry = Registry::new();
        registry.register::<Alpha>("Alpha").publish().unwrap();
        registry.register::<Alpha>("First").publish().unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup_by_name("Alpha").is_err());
        assert_eq!(registry.lookup_type::<Alpha>().unwrap().name(), "First");
        assert_eq!(registry.type_names(), vec!["First"]);
    }

    #[test]
    fn test_replace_disabled() {
        let mut registry =
            Registry::with_config(RegistryConfig::default().with_replace_existing(false));
        registry.register::<Alpha>("Alpha").publish().unwrap();
        let err = registry.register::<Alpha>("Alpha").publish().unwrap_err();
        assert_eq!(err, ReflectError::AlreadyRegistered("Alpha".to_string()));
    }

    #[test]
    fn test_global_registry() {
        register_global::<Beta>("GlobalBeta", |b| b).unwrap();
        assert!(lookup_global(TypeDesc::of::<Beta>()).is_ok());
        assert_eq!(lookup_global_by_name("GlobalBeta").unwrap().name(), "GlobalBeta");
        assert!(!Registry::init_global(RegistryConfig::default()));
    }

    #[test]
    fn test_register_global_holds_write_lock() {
        struct Gamma;

        let mut locked = false;
        register_global::<Gamma>("GlobalGamma", |b| {
            locked = Registry::global().try_read().is_none();
            b
        })
        .unwrap();
        assert!(locked);
        assert!(lookup_global(TypeDesc::of::<Gamma>()).is_ok());
    }
}

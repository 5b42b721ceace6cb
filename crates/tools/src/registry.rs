//! Manages registered tools, their schemas, and lookup.
//!
//! Keys are `(namespace, name)` pairs and registration order is preserved so
//! tools can be announced to the peer in the order the application added
//! them. The map is read by the inbound dispatcher and written by
//! registration calls running on other tasks, hence the interior lock.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use switchboard_protocol::ToolSpec;

use crate::descriptor::ToolDescriptor;

/// Thread-safe registry of local tools, keyed by `(namespace, name)`.
pub struct ToolRegistry {
    tools: RwLock<IndexMap<(String, String), Arc<ToolDescriptor>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(IndexMap::new()),
        }
    }

    /// Register a tool, compiling its schemas.
    ///
    /// Fails with [`RegistryError::DuplicateTool`] if the `(namespace, name)`
    /// pair is taken, or [`RegistryError::InvalidSchema`] if a schema does
    /// not compile. Either failure leaves the registry unchanged.
    pub fn register(&self, mut descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        descriptor
            .compile_schemas()
            .map_err(|reason| RegistryError::InvalidSchema {
                namespace: descriptor.namespace.clone(),
                name: descriptor.name.clone(),
                reason,
            })?;

        let key = (descriptor.namespace.clone(), descriptor.name.clone());
        let mut tools = self.tools.write().unwrap_or_else(|e| e.into_inner());
        if tools.contains_key(&key) {
            return Err(RegistryError::DuplicateTool {
                namespace: key.0,
                name: key.1,
            });
        }
        tools.insert(key, Arc::new(descriptor));
        Ok(())
    }

    /// Remove a tool, returning its descriptor if it was registered.
    ///
    /// Preserves the registration order of the remaining tools.
    pub fn remove(&self, namespace: &str, name: &str) -> Option<Arc<ToolDescriptor>> {
        let mut tools = self.tools.write().unwrap_or_else(|e| e.into_inner());
        tools.shift_remove(&(namespace.to_string(), name.to_string()))
    }

    /// Look up a tool by namespace and name.
    pub fn lookup(&self, namespace: &str, name: &str) -> Option<Arc<ToolDescriptor>> {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        tools
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Wire shapes of every registered tool, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        tools.values().map(|t| t.spec()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool '{namespace}.{name}' is already registered")]
    DuplicateTool { namespace: String, name: String },

    #[error("invalid schema for tool '{namespace}.{name}': {reason}")]
    InvalidSchema {
        namespace: String,
        name: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::add_tool;

    #[test]
    fn test_register_and_lookup() {
        let registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("math", "add").is_some());
        assert!(registry.lookup("math", "subtract").is_none());
        assert!(registry.lookup("other", "add").is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();

        let err = registry.register(add_tool()).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateTool { ref namespace, ref name }
                if namespace == "math" && name == "add"
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("math", "add").is_some());
    }

    #[test]
    fn test_remove_frees_the_name() {
        let registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();

        assert!(registry.remove("math", "add").is_some());
        assert!(registry.remove("math", "add").is_none());
        assert!(registry.is_empty());

        registry.register(add_tool()).unwrap();
        assert!(registry.lookup("math", "add").is_some());
    }

    #[test]
    fn test_same_name_different_namespace() {
        let registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();
        registry
            .register(crate::descriptor::ToolDescriptor::sync(
                "vectors",
                "add",
                |args| Ok(args),
            ))
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_invalid_schema_does_not_mutate() {
        let registry = ToolRegistry::new();
        let bad = crate::descriptor::ToolDescriptor::sync("misc", "bad", |args| Ok(args))
            .with_input_schema(serde_json::json!({"type": 42}));
        assert!(matches!(
            registry.register(bad),
            Err(RegistryError::InvalidSchema { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_specs_in_registration_order() {
        let registry = ToolRegistry::new();
        registry
            .register(crate::descriptor::ToolDescriptor::sync("b", "second", |a| Ok(a)))
            .unwrap();
        registry
            .register(crate::descriptor::ToolDescriptor::sync("a", "first", |a| Ok(a)))
            .unwrap();

        let specs = registry.specs();
        assert_eq!(specs[0].qualified_name(), "b.second");
        assert_eq!(specs[1].qualified_name(), "a.first");
    }
}

use super::context::{NativeHandler, RequestContext};
use super::extension::{Extension, ExtensionResult};
use super::error::EngineError;
use crate::core::value::PhpValue;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Functions and constants contributed by the loaded extensions.
///
/// Built once by `EngineBuilder` and then only read; every request resolves
/// builtins through it.
#[derive(Default)]
pub struct ExtensionRegistry {
    /// Lowercased name -> handler
    functions: HashMap<Box<[u8]>, NativeHandler>,
    constants: HashMap<Box<[u8]>, PhpValue>,
    /// In load order; shutdown hooks walk it backwards.
    extensions: IndexMap<&'static str, Box<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Function names are case-insensitive, so they are stored lowercased.
    pub fn register_function(&mut self, name: &[u8], handler: NativeHandler) {
        self.functions.insert(name.to_ascii_lowercase().into(), handler);
    }

    /// Constants are case-sensitive.
    pub fn register_constant(&mut self, name: &[u8], value: PhpValue) {
        self.constants.insert(name.into(), value);
    }

    pub fn get_function(&self, name: &[u8]) -> Option<NativeHandler> {
        self.functions.get(name.to_ascii_lowercase().as_slice()).copied()
    }

    pub fn get_constant(&self, name: &[u8]) -> Option<&PhpValue> {
        self.constants.get(name)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn extension_loaded(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    pub fn get_extensions(&self) -> Vec<&'static str> {
        self.extensions.keys().copied().collect()
    }

    /// Checks dependencies, runs MINIT, then records the extension.
    pub fn register_extension(&mut self, extension: Box<dyn Extension>) -> Result<(), EngineError> {
        let info = extension.info();
        if self.extensions.contains_key(info.name) {
            return Err(EngineError::DuplicateExtension(info.name));
        }
        if let Some(&dependency) = info
            .dependencies
            .iter()
            .find(|dep| !self.extensions.contains_key(**dep))
        {
            return Err(EngineError::MissingDependency {
                extension: info.name,
                dependency,
            });
        }

        if let ExtensionResult::Failure(reason) = extension.module_init(self) {
            return Err(EngineError::InitFailed {
                extension: info.name,
                reason,
            });
        }
        tracing::debug!(
            extension = info.name,
            version = info.version,
            functions = self.functions.len(),
            "extension loaded"
        );
        self.extensions.insert(info.name, extension);
        Ok(())
    }

    /// RINIT for every extension, in load order.
    pub fn request_init_all(&self, context: &mut RequestContext) {
        for (name, extension) in &self.extensions {
            if let ExtensionResult::Failure(reason) = extension.request_init(context) {
                tracing::warn!(extension = *name, "request init failed: {reason}");
            }
        }
    }

    /// RSHUTDOWN, newest extension first.
    pub fn request_shutdown_all(&self, context: &mut RequestContext) {
        for (name, extension) in self.extensions.iter().rev() {
            if let ExtensionResult::Failure(reason) = extension.request_shutdown(context) {
                tracing::warn!(extension = *name, "request shutdown failed: {reason}");
            }
        }
    }

    /// MSHUTDOWN, newest extension first.
    pub fn module_shutdown_all(&self) {
        for (name, extension) in self.extensions.iter().rev() {
            if let ExtensionResult::Failure(reason) = extension.module_shutdown() {
                tracing::warn!(extension = *name, "module shutdown failed: {reason}");
            }
        }
    }
}

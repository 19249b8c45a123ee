//! Engine and request state
//!
//! [`EngineContext`] is built once by [`EngineBuilder`] and shared read-only
//! between requests. It holds the function and constant tables of the loaded
//! extensions. [`RequestContext`] is the per-request half that builtins
//! receive; it owns the error handler and performs the checked conversions
//! that report diagnostics.

use crate::core::array::{IntStringKey, KeyCastNotice};
use crate::core::convert::{self, Number, NumericKind};
use crate::core::object::{ClassDef, PhpObject, PhpResource};
use crate::core::string::PhpString;
use crate::core::value::PhpValue;
use crate::runtime::config::RuntimeConfig;
use crate::runtime::diagnostics::{ErrorHandler, ErrorInfo, ErrorLevel, StderrErrorHandler};
use crate::runtime::error::{EngineError, PhpError};
use crate::runtime::extension::{Extension, StandardExtension};
use crate::runtime::registry::ExtensionRegistry;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::rc::Rc;
use std::sync::Arc;

/// Native function signature.
///
/// By-reference parameters arrive as the caller's storage slots (usually
/// [`PhpValue::Alias`]); builtins write through them.
pub type NativeHandler = fn(&mut RequestContext, &mut [PhpValue]) -> Result<PhpValue, PhpError>;

type ClosureBody = dyn Fn(&mut RequestContext, &mut [PhpValue]) -> Result<PhpValue, PhpError>;

/// Body of a `Closure` object created by the host.
pub struct NativeClosure(Box<ClosureBody>);

impl NativeClosure {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut RequestContext, &mut [PhpValue]) -> Result<PhpValue, PhpError> + 'static,
    {
        Self(Box::new(body))
    }

    pub fn call(&self, ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
        (self.0)(ctx, args)
    }
}

/// Engine-level state shared by every request.
pub struct EngineContext {
    pub registry: ExtensionRegistry,
}

impl EngineContext {
    /// Engine with only the standard extension loaded.
    pub fn new() -> Result<Arc<Self>, EngineError> {
        EngineBuilder::new().with_standard_extension().build()
    }
}

/// Per-request state: configuration, diagnostics, RNG and handle counters.
///
/// Nothing here is global; two requests never observe each other's state.
pub struct RequestContext {
    pub engine: Arc<EngineContext>,
    pub config: RuntimeConfig,
    error_handler: Box<dyn ErrorHandler>,
    last_error: Option<ErrorInfo>,
    rng: StdRng,
    next_object_id: u64,
    next_resource_id: i64,
    closure_class: Rc<ClassDef>,
}

impl RequestContext {
    pub fn new(engine: Arc<EngineContext>) -> Self {
        Self::with_config(engine, RuntimeConfig::default())
    }

    pub fn with_config(engine: Arc<EngineContext>, config: RuntimeConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut ctx = Self {
            engine: Arc::clone(&engine),
            config,
            error_handler: Box::new(StderrErrorHandler::default()),
            last_error: None,
            rng,
            next_object_id: 1,
            next_resource_id: 1,
            closure_class: Rc::new(ClassDef::new("Closure")),
        };
        engine.registry.request_init_all(&mut ctx);
        ctx
    }

    pub fn set_error_handler(&mut self, handler: impl ErrorHandler + 'static) {
        self.error_handler = Box::new(handler);
    }

    /// Raise a recoverable diagnostic.
    ///
    /// The error is always remembered for `error_get_last()`; it only reaches
    /// the handler when its level is enabled in `error_reporting`.
    pub fn report(&mut self, level: ErrorLevel, message: &str) {
        self.last_error = Some(ErrorInfo {
            level,
            message: message.to_string(),
        });
        if self.config.error_reporting & level.to_bitmask() != 0 {
            self.error_handler.report(level, message);
        }
    }

    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.last_error.as_ref()
    }

    pub fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// `mt_srand($seed)`
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn new_object(&mut self, class: Rc<ClassDef>) -> PhpObject {
        let id = self.next_object_id;
        self.next_object_id += 1;
        PhpObject::new(id, class)
    }

    pub fn new_resource(&mut self, kind: &str) -> PhpResource {
        let id = self.next_resource_id;
        self.next_resource_id += 1;
        PhpResource::new(id, kind)
    }

    /// Wrap a host closure into a PHP `Closure` object.
    pub fn new_closure<F>(&mut self, body: F) -> PhpValue
    where
        F: Fn(&mut RequestContext, &mut [PhpValue]) -> Result<PhpValue, PhpError> + 'static,
    {
        let id = self.next_object_id;
        self.next_object_id += 1;
        let body: Rc<dyn std::any::Any> = Rc::new(NativeClosure::new(body));
        PhpValue::Object(PhpObject::with_internal(id, Rc::clone(&self.closure_class), body))
    }

    fn closure_body(value: &PhpValue) -> Option<Rc<NativeClosure>> {
        match value {
            PhpValue::Object(obj) => obj
                .internal()
                .and_then(|internal| Rc::clone(internal).downcast::<NativeClosure>().ok()),
            _ => None,
        }
    }

    /// `is_callable($value)`: closures and names of registered functions.
    pub fn is_callable(&self, value: &PhpValue) -> bool {
        value.with_deref(|v| match v {
            PhpValue::String(name) => self.engine.registry.get_function(name.as_bytes()).is_some(),
            other => Self::closure_body(other).is_some(),
        })
    }

    /// Check a callback parameter up front so the caller can fail before it
    /// starts mutating anything.
    pub fn expect_callable(&self, value: &PhpValue, function: &str, arg: usize) -> Result<(), PhpError> {
        if self.is_callable(value) {
            return Ok(());
        }
        let reason = match value.as_string() {
            Some(name) => format!("function \"{name}\" not found or invalid function name"),
            None => "no array or string given".to_string(),
        };
        Err(PhpError::TypeError(format!(
            "{function}(): Argument #{arg} ($callback) must be a valid callback, {reason}"
        )))
    }

    pub fn call_callable(&mut self, callback: &PhpValue, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
        let callback = callback.copy_value();
        if let PhpValue::String(name) = &callback {
            return self.call_function(&name.to_string_lossy(), args);
        }
        match Self::closure_body(&callback) {
            Some(body) => body.call(self, args),
            None => Err(PhpError::Error("Value not callable".into())),
        }
    }

    /// Call a registered native function by name.
    pub fn call_function(&mut self, name: &str, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
        match self.engine.registry.get_function(name.as_bytes()) {
            Some(handler) => handler(self, args),
            None => Err(PhpError::Error(format!("Call to undefined function {name}()"))),
        }
    }

    // ---- checked conversions ----

    /// String conversion as performed by `echo` and string operators.
    /// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - zval_try_get_string_func
    pub fn convert_to_string(&mut self, value: &PhpValue) -> Result<PhpString, PhpError> {
        let value = value.copy_value();
        match &value {
            PhpValue::Array(_) => {
                self.report(ErrorLevel::Warning, "Array to string conversion");
                Ok(PhpString::from("Array"))
            }
            PhpValue::Object(obj) => obj.to_php_string().ok_or_else(|| {
                PhpError::TypeError(format!(
                    "Object of class {} could not be converted to string",
                    obj.class_name()
                ))
            }),
            other => Ok(other.to_php_string_with_precision(self.config.precision)),
        }
    }

    /// Numeric conversion for arithmetic operands.
    pub fn convert_to_number(&mut self, value: &PhpValue) -> Result<Number, PhpError> {
        let parsed = value.to_number();
        match parsed.kind {
            NumericKind::Numeric => Ok(parsed.number),
            NumericKind::LeadingNumeric => {
                self.report(ErrorLevel::Notice, "A non well formed numeric value encountered");
                Ok(parsed.number)
            }
            NumericKind::NonNumeric if value.is_array() || value.is_object() => Err(
                PhpError::TypeError(format!("Unsupported operand types: {}", value.debug_type_name())),
            ),
            NumericKind::NonNumeric => {
                self.report(ErrorLevel::Warning, "A non-numeric value encountered");
                Ok(Number::Long(0))
            }
        }
    }

    pub fn convert_to_long(&mut self, value: &PhpValue) -> Result<i64, PhpError> {
        Ok(self.convert_to_number(value)?.to_long())
    }

    /// Key conversion for `$array[$offset]`.
    pub fn convert_to_key(&mut self, value: &PhpValue) -> Result<IntStringKey, PhpError> {
        let (key, notice) = IntStringKey::try_from_value(value)?;
        match notice {
            Some(KeyCastNotice::FractionalFloat(d)) => {
                let message = format!(
                    "Implicit conversion from float {} to int loses precision",
                    convert::format_double(d, -1)
                );
                self.report(ErrorLevel::Deprecated, &message);
            }
            Some(KeyCastNotice::Resource(id)) => {
                let message = format!("Resource ID#{id} used as offset, casting to integer ({id})");
                self.report(ErrorLevel::Warning, &message);
            }
            None => {}
        }
        Ok(key)
    }

    /// `$s[$offset] = $value`
    /// Reference: $PHP_SRC_PATH/Zend/zend_execute.c - zend_assign_to_string_offset
    pub fn assign_string_offset(
        &mut self,
        target: &mut PhpString,
        offset: i64,
        value: &PhpValue,
    ) -> Result<(), PhpError> {
        let replacement = self.convert_to_string(value)?;
        let Some(&byte) = replacement.as_bytes().first() else {
            return Err(PhpError::Error("Cannot assign an empty string to a string offset".into()));
        };
        if replacement.len() > 1 {
            self.report(
                ErrorLevel::Warning,
                "Only the first byte will be assigned to the string offset",
            );
        }
        if !target.set_byte(offset, byte) {
            self.report(ErrorLevel::Warning, &format!("Illegal string offset {offset}"));
        }
        Ok(())
    }
}

/// Assembles an [`EngineContext`] from extensions.
pub struct EngineBuilder {
    extensions: Vec<Box<dyn Extension>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            extensions: Vec::new(),
        }
    }

    pub fn with_extension<E: Extension + 'static>(mut self, extension: E) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Add the standard library (array and variable functions)
    pub fn with_standard_extension(self) -> Self {
        self.with_extension(StandardExtension)
    }

    /// Registers the extensions in the order they were added, running MINIT
    /// for each.
    pub fn build(self) -> Result<Arc<EngineContext>, EngineError> {
        let mut registry = ExtensionRegistry::new();
        for extension in self.extensions {
            registry.register_extension(extension)?;
        }
        Ok(Arc::new(EngineContext { registry }))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        let engine = Arc::clone(&self.engine);
        engine.registry.request_shutdown_all(self);
    }
}

impl Drop for EngineContext {
    fn drop(&mut self) {
        self.registry.module_shutdown_all();
    }
}

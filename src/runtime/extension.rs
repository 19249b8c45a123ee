use super::context::RequestContext;
use super::registry::ExtensionRegistry;
use crate::builtins::{array, variable};
use crate::core::value::PhpValue;
use crate::runtime::diagnostics::{
    E_ALL, E_DEPRECATED, E_ERROR, E_NOTICE, E_PARSE, E_USER_ERROR, E_USER_NOTICE,
    E_USER_WARNING, E_WARNING,
};

/// Static description of an extension.
#[derive(Debug, Clone)]
pub struct ExtensionInfo {
    pub name: &'static str,
    pub version: &'static str,
    /// Extensions that must be registered first.
    pub dependencies: &'static [&'static str],
}

/// Outcome of a lifecycle hook.
#[derive(Debug)]
pub enum ExtensionResult {
    Success,
    Failure(String),
}

impl ExtensionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtensionResult::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ExtensionResult::Failure(_))
    }
}

/// A bundle of builtins with Zend-style lifecycle hooks.
///
/// `module_init` runs once from `EngineBuilder::build` and is where
/// functions and constants get registered. `request_init` runs when a
/// `RequestContext` is created and `request_shutdown` when it is dropped;
/// `module_shutdown` runs when the engine is dropped. Shutdown hooks visit
/// extensions in reverse load order.
///
/// Not `Send`: requests hold `Rc` values and stay on one thread.
pub trait Extension {
    fn info(&self) -> ExtensionInfo;

    fn module_init(&self, _registry: &mut ExtensionRegistry) -> ExtensionResult {
        ExtensionResult::Success
    }

    fn module_shutdown(&self) -> ExtensionResult {
        ExtensionResult::Success
    }

    fn request_init(&self, _context: &mut RequestContext) -> ExtensionResult {
        ExtensionResult::Success
    }

    fn request_shutdown(&self, _context: &mut RequestContext) -> ExtensionResult {
        ExtensionResult::Success
    }
}

/// The array and variable-handling library.
pub struct StandardExtension;

impl Extension for StandardExtension {
    fn info(&self) -> ExtensionInfo {
        ExtensionInfo {
            name: "standard",
            version: "8.3.0",
            dependencies: &[],
        }
    }

    fn module_init(&self, registry: &mut ExtensionRegistry) -> ExtensionResult {
        // Array functions
        registry.register_function(b"count", array::php_count);
        registry.register_function(b"sizeof", array::php_count);
        registry.register_function(b"sort", array::php_sort);
        registry.register_function(b"rsort", array::php_rsort);
        registry.register_function(b"usort", array::php_usort);
        registry.register_function(b"asort", array::php_asort);
        registry.register_function(b"arsort", array::php_arsort);
        registry.register_function(b"uasort", array::php_uasort);
        registry.register_function(b"ksort", array::php_ksort);
        registry.register_function(b"krsort", array::php_krsort);
        registry.register_function(b"uksort", array::php_uksort);
        registry.register_function(b"shuffle", array::php_shuffle);
        registry.register_function(b"array_reverse", array::php_array_reverse);
        registry.register_function(b"array_diff", array::php_array_diff);
        registry.register_function(b"array_diff_key", array::php_array_diff_key);
        registry.register_function(b"array_diff_assoc", array::php_array_diff_assoc);
        registry.register_function(b"array_udiff", array::php_array_udiff);
        registry.register_function(b"array_intersect", array::php_array_intersect);
        registry.register_function(b"array_intersect_key", array::php_array_intersect_key);
        registry.register_function(b"array_intersect_assoc", array::php_array_intersect_assoc);
        registry.register_function(b"array_unique", array::php_array_unique);
        registry.register_function(b"array_push", array::php_array_push);
        registry.register_function(b"array_pop", array::php_array_pop);
        registry.register_function(b"array_shift", array::php_array_shift);
        registry.register_function(b"array_unshift", array::php_array_unshift);
        registry.register_function(b"array_keys", array::php_array_keys);
        registry.register_function(b"array_values", array::php_array_values);
        registry.register_function(b"array_merge", array::php_array_merge);
        registry.register_function(b"array_slice", array::php_array_slice);
        registry.register_function(b"array_chunk", array::php_array_chunk);
        registry.register_function(b"array_key_exists", array::php_array_key_exists);
        registry.register_function(b"key_exists", array::php_array_key_exists);
        registry.register_function(b"in_array", array::php_in_array);
        registry.register_function(b"array_search", array::php_array_search);
        registry.register_function(b"array_is_list", array::php_array_is_list);
        registry.register_function(b"array_key_first", array::php_array_key_first);
        registry.register_function(b"array_key_last", array::php_array_key_last);
        registry.register_function(b"current", array::php_current);
        registry.register_function(b"pos", array::php_current);
        registry.register_function(b"key", array::php_key);
        registry.register_function(b"next", array::php_next);
        registry.register_function(b"prev", array::php_prev);
        registry.register_function(b"reset", array::php_reset);
        registry.register_function(b"end", array::php_end);

        // Variable functions
        registry.register_function(b"print_r", variable::php_print_r);
        registry.register_function(b"var_dump", variable::php_var_dump);
        registry.register_function(b"var_export", variable::php_var_export);
        registry.register_function(b"gettype", variable::php_gettype);
        registry.register_function(b"get_debug_type", variable::php_get_debug_type);
        registry.register_function(b"is_numeric", variable::php_is_numeric);
        registry.register_function(b"is_callable", variable::php_is_callable);
        registry.register_function(b"intval", variable::php_intval);
        registry.register_function(b"floatval", variable::php_floatval);
        registry.register_function(b"doubleval", variable::php_floatval);
        registry.register_function(b"strval", variable::php_strval);
        registry.register_function(b"boolval", variable::php_boolval);
        registry.register_function(b"ini_get", variable::php_ini_get);
        registry.register_function(b"ini_set", variable::php_ini_set);
        registry.register_function(b"error_reporting", variable::php_error_reporting);
        registry.register_function(b"error_get_last", variable::php_error_get_last);

        for (name, value) in [
            ("E_ERROR", E_ERROR),
            ("E_WARNING", E_WARNING),
            ("E_PARSE", E_PARSE),
            ("E_NOTICE", E_NOTICE),
            ("E_USER_ERROR", E_USER_ERROR),
            ("E_USER_WARNING", E_USER_WARNING),
            ("E_USER_NOTICE", E_USER_NOTICE),
            ("E_DEPRECATED", E_DEPRECATED),
            ("E_ALL", E_ALL),
            ("SORT_REGULAR", 0),
            ("SORT_NUMERIC", 1),
            ("SORT_STRING", 2),
            ("COUNT_NORMAL", 0),
            ("COUNT_RECURSIVE", 1),
            ("PHP_INT_MAX", i64::MAX),
            ("PHP_INT_MIN", i64::MIN),
            ("PHP_INT_SIZE", 8),
        ] {
            registry.register_constant(name.as_bytes(), PhpValue::Long(value));
        }

        ExtensionResult::Success
    }
}

//! Variable handling: dumpers, type inspection, casts and ini access
//!
//! There is no output layer in this runtime, so `print_r`, `var_dump` and
//! `var_export` always return what they render.

use super::{VARIADIC, expect_args, long_arg, opt_arg};
use crate::core::alias::PhpAlias;
use crate::core::array::{IntStringKey, OrderedDictionary};
use crate::core::convert;
use crate::core::object::PhpObject;
use crate::core::string::PhpString;
use crate::core::value::PhpValue;
use crate::runtime::context::RequestContext;
use crate::runtime::diagnostics::ErrorLevel;
use crate::runtime::error::PhpError;

/// Containers currently being rendered; meeting one again means a cycle.
#[derive(Default)]
struct Path {
    aliases: Vec<PhpAlias>,
    objects: Vec<PhpObject>,
}

impl Path {
    fn contains_alias(&self, alias: &PhpAlias) -> bool {
        self.aliases.iter().any(|a| a.ptr_eq(alias))
    }

    fn contains_object(&self, object: &PhpObject) -> bool {
        self.objects.iter().any(|o| o.ptr_eq(object))
    }
}

fn spaces(out: &mut Vec<u8>, n: usize) {
    out.resize(out.len() + n, b' ');
}

fn object_entries(object: &PhpObject) -> Vec<(IntStringKey, PhpValue)> {
    object
        .properties()
        .iter()
        .map(|(name, value)| (IntStringKey::Str(name.clone()), value.clone()))
        .collect()
}

// ---- print_r ----

struct PrintR {
    out: Vec<u8>,
    precision: i32,
    path: Path,
}

impl PrintR {
    /// Reference: $PHP_SRC_PATH/Zend/zend.c - print_hash
    fn hash(&mut self, entries: impl Iterator<Item = (IntStringKey, PhpValue)>, indent: usize) {
        spaces(&mut self.out, indent);
        self.out.extend_from_slice(b"(\n");
        for (key, value) in entries {
            spaces(&mut self.out, indent + 4);
            self.out.push(b'[');
            self.out.extend_from_slice(key.to_php_string().as_bytes());
            self.out.extend_from_slice(b"] => ");
            self.value(&value, indent + 8);
            self.out.push(b'\n');
        }
        spaces(&mut self.out, indent);
        self.out.extend_from_slice(b")\n");
    }

    fn value(&mut self, value: &PhpValue, indent: usize) {
        match value {
            PhpValue::Alias(alias) => {
                if self.path.contains_alias(alias) {
                    let header = alias.with(|v| match v {
                        PhpValue::Object(o) => format!("{} Object\n", o.class_name()),
                        _ => "Array\n".to_string(),
                    });
                    self.out.extend_from_slice(header.as_bytes());
                    self.out.extend_from_slice(b" *RECURSION*");
                    return;
                }
                self.path.aliases.push(alias.clone());
                self.value(&alias.get(), indent);
                self.path.aliases.pop();
            }
            PhpValue::Array(array) => {
                self.out.extend_from_slice(b"Array\n");
                self.hash(array.iter().map(|(k, v)| (k, v.clone())), indent);
            }
            PhpValue::Object(object) => {
                self.out.extend_from_slice(object.class_name().as_bytes());
                self.out.extend_from_slice(b" Object\n");
                if self.path.contains_object(object) {
                    self.out.extend_from_slice(b" *RECURSION*");
                    return;
                }
                self.path.objects.push(object.clone());
                self.hash(object_entries(object).into_iter(), indent);
                self.path.objects.pop();
            }
            scalar => self
                .out
                .extend_from_slice(scalar.to_php_string_with_precision(self.precision).as_bytes()),
        }
    }
}

/// `print_r($value, $return = false)`
pub fn php_print_r(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("print_r", args, 1, 2)?;
    let mut printer = PrintR {
        out: Vec::new(),
        precision: ctx.config.precision,
        path: Path::default(),
    };
    printer.value(&args[0].copy_value(), 0);
    Ok(PhpValue::from(printer.out))
}

// ---- var_dump ----

struct VarDump {
    out: Vec<u8>,
    precision: i32,
    path: Path,
}

impl VarDump {
    fn element_key(&mut self, key: &IntStringKey, level: usize) {
        spaces(&mut self.out, level + 1);
        match key {
            IntStringKey::Int(i) => self.out.extend_from_slice(format!("[{i}]=>\n").as_bytes()),
            IntStringKey::Str(s) => {
                self.out.extend_from_slice(b"[\"");
                self.out.extend_from_slice(s.as_bytes());
                self.out.extend_from_slice(b"\"]=>\n");
            }
        }
    }

    fn close(&mut self, level: usize) {
        if level > 1 {
            spaces(&mut self.out, level - 1);
        }
        self.out.extend_from_slice(b"}\n");
    }

    /// Reference: $PHP_SRC_PATH/ext/standard/var.c - php_var_dump
    fn value(&mut self, value: &PhpValue, level: usize) {
        if level > 1 && !value.is_alias() {
            spaces(&mut self.out, level - 1);
        }
        let line = match value {
            PhpValue::Alias(alias) => {
                if self.path.contains_alias(alias) {
                    spaces(&mut self.out, level.saturating_sub(1));
                    self.out.extend_from_slice(b"*RECURSION*\n");
                    return;
                }
                self.path.aliases.push(alias.clone());
                self.value(&alias.get(), level);
                self.path.aliases.pop();
                return;
            }
            PhpValue::Null => "NULL".to_string(),
            PhpValue::Bool(b) => format!("bool({b})"),
            PhpValue::Long(i) => format!("int({i})"),
            PhpValue::Double(d) => format!("float({})", convert::format_double(*d, self.precision)),
            PhpValue::String(s) => {
                self.out.extend_from_slice(format!("string({}) \"", s.len()).as_bytes());
                self.out.extend_from_slice(s.as_bytes());
                self.out.extend_from_slice(b"\"\n");
                return;
            }
            PhpValue::Array(array) => {
                self.out.extend_from_slice(format!("array({}) {{\n", array.len()).as_bytes());
                for (key, element) in array.iter() {
                    self.element_key(&key, level);
                    self.value(element, level + 2);
                }
                self.close(level);
                return;
            }
            PhpValue::Object(object) => {
                if self.path.contains_object(object) {
                    self.out.extend_from_slice(b"*RECURSION*\n");
                    return;
                }
                let entries = object_entries(object);
                self.out.extend_from_slice(
                    format!(
                        "object({})#{} ({}) {{\n",
                        object.class_name(),
                        object.id(),
                        entries.len()
                    )
                    .as_bytes(),
                );
                self.path.objects.push(object.clone());
                for (key, element) in &entries {
                    self.element_key(key, level);
                    self.value(element, level + 2);
                }
                self.path.objects.pop();
                self.close(level);
                return;
            }
            PhpValue::Resource(resource) => {
                let kind = if resource.is_open() { resource.kind() } else { "Unknown" };
                format!("resource({}) of type ({kind})", resource.id())
            }
        };
        self.out.extend_from_slice(line.as_bytes());
        self.out.push(b'\n');
    }
}

/// `var_dump(...$values)`
pub fn php_var_dump(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("var_dump", args, 1, VARIADIC)?;
    let mut dumper = VarDump {
        out: Vec::new(),
        precision: ctx.config.serialize_precision,
        path: Path::default(),
    };
    for value in args.iter() {
        dumper.value(&value.copy_value(), 1);
    }
    Ok(PhpValue::from(dumper.out))
}

// ---- var_export ----

struct VarExport<'a> {
    ctx: &'a mut RequestContext,
    out: Vec<u8>,
    path: Path,
}

impl VarExport<'_> {
    /// Single-quoted PHP literal; NUL bytes are spliced in as `"\0"`.
    fn quoted(&mut self, bytes: &[u8]) {
        self.out.push(b'\'');
        for &b in bytes {
            match b {
                b'\'' | b'\\' => self.out.extend_from_slice(&[b'\\', b]),
                0 => self.out.extend_from_slice(b"' . \"\\0\" . '"),
                _ => self.out.push(b),
            }
        }
        self.out.push(b'\'');
    }

    fn long(&mut self, i: i64) {
        if i == i64::MIN {
            // the literal 9223372036854775808 would parse as a float
            self.out.extend_from_slice(b"-9223372036854775807-1");
        } else {
            self.out.extend_from_slice(i.to_string().as_bytes());
        }
    }

    fn nested_start(&mut self, level: usize) {
        if level > 1 {
            self.out.push(b'\n');
            spaces(&mut self.out, level - 1);
        }
    }

    /// Reference: $PHP_SRC_PATH/ext/standard/var.c - php_var_export_ex
    fn value(&mut self, value: &PhpValue, level: usize) {
        match value {
            PhpValue::Alias(alias) => {
                if self.path.contains_alias(alias) {
                    self.ctx.report(
                        ErrorLevel::Warning,
                        "var_export does not handle circular references",
                    );
                    self.out.extend_from_slice(b"NULL");
                    return;
                }
                self.path.aliases.push(alias.clone());
                self.value(&alias.get(), level);
                self.path.aliases.pop();
            }
            PhpValue::Null => self.out.extend_from_slice(b"NULL"),
            PhpValue::Bool(b) => self.out.extend_from_slice(if *b { b"true".as_slice() } else { b"false" }),
            PhpValue::Long(i) => self.long(*i),
            PhpValue::Double(d) => {
                let text = convert::format_double(*d, self.ctx.config.serialize_precision);
                self.out.extend_from_slice(text.as_bytes());
                if d.is_finite() && !text.contains(['.', 'e', 'E']) {
                    self.out.extend_from_slice(b".0");
                }
            }
            PhpValue::String(s) => self.quoted(s.as_bytes()),
            PhpValue::Array(array) => {
                self.nested_start(level);
                self.out.extend_from_slice(b"array (\n");
                for (key, element) in array.iter() {
                    spaces(&mut self.out, level + 1);
                    match &key {
                        IntStringKey::Int(i) => self.long(*i),
                        IntStringKey::Str(s) => self.quoted(s.as_bytes()),
                    }
                    self.out.extend_from_slice(b" => ");
                    self.value(element, level + 2);
                    self.out.extend_from_slice(b",\n");
                }
                if level > 1 {
                    spaces(&mut self.out, level - 1);
                }
                self.out.push(b')');
            }
            PhpValue::Object(object) => {
                if self.path.contains_object(object) {
                    self.ctx.report(
                        ErrorLevel::Warning,
                        "var_export does not handle circular references",
                    );
                    self.out.extend_from_slice(b"NULL");
                    return;
                }
                self.nested_start(level);
                let std_class = object.class_name() == "stdClass";
                if std_class {
                    self.out.extend_from_slice(b"(object) array(\n");
                } else {
                    self.out.push(b'\\');
                    self.out.extend_from_slice(object.class_name().as_bytes());
                    self.out.extend_from_slice(b"::__set_state(array(\n");
                }
                self.path.objects.push(object.clone());
                for (key, element) in object_entries(object) {
                    spaces(&mut self.out, level + 2);
                    self.quoted(key.to_php_string().as_bytes());
                    self.out.extend_from_slice(b" => ");
                    self.value(&element, level + 2);
                    self.out.extend_from_slice(b",\n");
                }
                self.path.objects.pop();
                if level > 1 {
                    spaces(&mut self.out, level - 1);
                }
                self.out
                    .extend_from_slice(if std_class { b")".as_slice() } else { b"))" });
            }
            PhpValue::Resource(_) => {
                self.ctx
                    .report(ErrorLevel::Warning, "var_export does not handle resources");
                self.out.extend_from_slice(b"NULL");
            }
        }
    }
}

/// `var_export($value, $return = false)`
pub fn php_var_export(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("var_export", args, 1, 2)?;
    let value = args[0].copy_value();
    let mut exporter = VarExport {
        ctx,
        out: Vec::new(),
        path: Path::default(),
    };
    exporter.value(&value, 1);
    Ok(PhpValue::from(exporter.out))
}

// ---- type inspection ----

pub fn php_gettype(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("gettype", args, 1, 1)?;
    Ok(PhpValue::from(args[0].type_name()))
}

pub fn php_get_debug_type(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("get_debug_type", args, 1, 1)?;
    let name = match args[0].as_resource() {
        Some(r) if r.is_open() => format!("resource ({})", r.kind()),
        Some(_) => "resource (closed)".to_string(),
        None => args[0].debug_type_name(),
    };
    Ok(PhpValue::from(name))
}

pub fn php_is_numeric(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("is_numeric", args, 1, 1)?;
    let numeric = args[0].with_deref(|v| match v {
        PhpValue::Long(_) | PhpValue::Double(_) => true,
        PhpValue::String(s) => convert::is_numeric(s.as_bytes()),
        _ => false,
    });
    Ok(PhpValue::Bool(numeric))
}

pub fn php_is_callable(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("is_callable", args, 1, 3)?;
    Ok(PhpValue::Bool(ctx.is_callable(&args[0])))
}

// ---- casts ----

/// `strtol` over a byte string: optional whitespace and sign, an optional
/// radix prefix, then digits up to the first invalid one. Saturates.
fn parse_long_in_base(s: &[u8], mut base: u32) -> i64 {
    let mut rest = s.trim_ascii_start();
    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };
    let prefix = |rest: &[u8], letter: u8| {
        rest.len() > 1 && rest[0] == b'0' && rest[1].eq_ignore_ascii_case(&letter)
    };
    if base == 0 {
        base = if prefix(rest, b'x') {
            16
        } else if prefix(rest, b'b') {
            2
        } else if prefix(rest, b'o') || rest.first() == Some(&b'0') {
            8
        } else {
            10
        };
    }
    if (base == 16 && prefix(rest, b'x'))
        || (base == 2 && prefix(rest, b'b'))
        || (base == 8 && prefix(rest, b'o'))
    {
        rest = &rest[2..];
    }

    let mut acc: i128 = 0;
    for &b in rest {
        let Some(digit) = (b as char).to_digit(36).filter(|d| *d < base) else {
            break;
        };
        acc = (acc * i128::from(base) + i128::from(digit)).min(i128::from(i64::MAX) + 1);
    }
    let signed = if negative { -acc } else { acc };
    signed.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// `intval($value, $base = 10)`
pub fn php_intval(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("intval", args, 1, 2)?;
    let base = long_arg(args, 1, 10);
    if base != 10 {
        if let Some(s) = args[0].as_string() {
            // strtol yields 0 for an unusable base
            let parsed = u32::try_from(base)
                .ok()
                .filter(|b| *b == 0 || (2..=36).contains(b))
                .map_or(0, |b| parse_long_in_base(s.as_bytes(), b));
            return Ok(PhpValue::Long(parsed));
        }
    }
    Ok(PhpValue::Long(args[0].to_long()))
}

pub fn php_floatval(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("floatval", args, 1, 1)?;
    Ok(PhpValue::Double(args[0].to_double()))
}

pub fn php_strval(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("strval", args, 1, 1)?;
    Ok(PhpValue::String(ctx.convert_to_string(&args[0])?))
}

pub fn php_boolval(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("boolval", args, 1, 1)?;
    Ok(PhpValue::Bool(args[0].to_bool()))
}

// ---- configuration and diagnostics ----

pub fn php_ini_get(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("ini_get", args, 1, 1)?;
    let name = args[0].to_php_string();
    Ok(match ctx.config.get(&name.to_string_lossy()) {
        Some(value) => PhpValue::from(value),
        None => PhpValue::Bool(false),
    })
}

pub fn php_ini_set(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("ini_set", args, 2, 2)?;
    let name = args[0].to_php_string().to_string_lossy().into_owned();
    let value = args[1].to_php_string();
    match ctx.config.set(&name, &value.to_string_lossy()) {
        Ok(old) => {
            if let ("random_seed", Some(seed)) = (name.as_str(), ctx.config.random_seed) {
                ctx.reseed(seed);
            }
            Ok(PhpValue::from(old))
        }
        Err(err) => {
            tracing::debug!(%err, "ini_set rejected");
            Ok(PhpValue::Bool(false))
        }
    }
}

/// `error_reporting($level = null)`: returns the previous level.
pub fn php_error_reporting(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("error_reporting", args, 0, 1)?;
    let old = ctx.config.error_reporting;
    if let Some(level) = opt_arg(args, 0) {
        ctx.config.error_reporting = level.to_long();
    }
    Ok(PhpValue::Long(old))
}

pub fn php_error_get_last(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("error_get_last", args, 0, 0)?;
    let Some(info) = ctx.last_error() else {
        return Ok(PhpValue::Null);
    };
    let mut result = OrderedDictionary::with_capacity(4);
    result.set(IntStringKey::from("type"), PhpValue::Long(info.level.to_bitmask()));
    result.set(IntStringKey::from("message"), PhpValue::from(info.message.as_str()));
    result.set(IntStringKey::from("file"), PhpValue::String(PhpString::new()));
    result.set(IntStringKey::from("line"), PhpValue::Long(0));
    Ok(PhpValue::from(result))
}

//! Free-standing builtin dispatch table (spec.md §4.4).
//!
//! Built once behind a `once_cell::Lazy`, per spec.md §9's "global
//! builtin tables ... built once at startup as immutable lookup maps".
//! Each entry carries a declared `ArgSchema` enforced by
//! [`check_schema`] before the native function runs.

use std::collections::HashMap;
use std::fs;
use std::rc::Rc;

use once_cell::sync::Lazy;

use crate::bytesfile::BytesFile;
use crate::elf::ElfFile;
use crate::environment::Env;
use crate::hex::{HexFile, Origin};
use crate::object::{ArgSchema, Builtin, HashKey, Object, TypeTag};

use super::{Evaluator, EvalError, Flow, RuntimeErrorKind};

/// Enforces arity and per-position type schema before a builtin or
/// method runs (spec.md §4.4).
pub fn check_schema(builtin: &Builtin, args: &[Object], line: usize) -> Result<(), EvalError> {
    let schema = &builtin.schema;

    if matches!(schema.first(), Some(ArgSchema::AnyVarargs)) {
        return Ok(());
    }

    let has_optional = matches!(schema.last(), Some(ArgSchema::AnyOptional));
    let min_arity = if has_optional { schema.len() - 1 } else { schema.len() };
    if args.len() < min_arity || args.len() > schema.len() {
        return Err(EvalError::static_err(
            format!(
                "{}: expected {} argument(s), got {}",
                builtin.name,
                min_arity,
                args.len()
            ),
            line,
        ));
    }

    for (i, arg) in args.iter().enumerate() {
        match &schema[i] {
            ArgSchema::Concrete(tag) => {
                if arg.type_tag() != *tag {
                    return Err(EvalError::static_err(
                        format!(
                            "{}: argument {} expected {}, got {}",
                            builtin.name,
                            i + 1,
                            tag,
                            arg.type_tag()
                        ),
                        line,
                    ));
                }
            }
            ArgSchema::OneOf(tags) => {
                if !tags.contains(&arg.type_tag()) {
                    return Err(EvalError::static_err(
                        format!("{}: argument {} has unexpected type {}", builtin.name, i + 1, arg.type_tag()),
                        line,
                    ));
                }
            }
            ArgSchema::Any | ArgSchema::AnyOptional | ArgSchema::AnyVarargs => {}
        }
    }
    Ok(())
}

fn expect_int(obj: &Object, name: &str, line: usize) -> Result<i64, EvalError> {
    match obj {
        Object::Int(v) => Ok(*v),
        other => Err(EvalError::static_err(format!("{name}: expected an int, got {}", other.type_tag()), line)),
    }
}

fn expect_str<'a>(obj: &'a Object, name: &str, line: usize) -> Result<&'a str, EvalError> {
    match obj {
        Object::Str(s) => Ok(s.as_str()),
        other => Err(EvalError::static_err(format!("{name}: expected a str, got {}", other.type_tag()), line)),
    }
}

fn bytes_from_array(obj: &Object, name: &str, line: usize) -> Result<Vec<u8>, EvalError> {
    match obj {
        Object::Array(items) => items
            .iter()
            .map(|item| match item {
                Object::Int(v) if (0..=255).contains(v) => Ok(*v as u8),
                Object::Int(v) => Err(EvalError::static_err(format!("{name}: byte value {v} out of range [0,255]"), line)),
                other => Err(EvalError::static_err(format!("{name}: expected an int byte, got {}", other.type_tag()), line)),
            })
            .collect(),
        other => Err(EvalError::static_err(format!("{name}: expected an array of bytes, got {}", other.type_tag()), line)),
    }
}

fn array_from_bytes(bytes: &[u8]) -> Object {
    Object::new_array(bytes.iter().map(|b| Object::Int(*b as i64)).collect())
}

fn builtin_hex(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    match &args[0] {
        Object::Int(v) => Ok(Flow::Value(Object::new_str(format!("0x{:x}", *v as u64)))),
        Object::Str(s) => {
            let digits = s.as_str();
            if digits.is_empty() || digits.len() % 2 != 0 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(EvalError::runtime(
                    RuntimeErrorKind::Type,
                    "hex: expected a non-empty even-length string of hex digits",
                    line,
                ));
            }
            let bytes: Vec<u8> = (0..digits.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).unwrap())
                .collect();
            Ok(Flow::Value(array_from_bytes(&bytes)))
        }
        other => Err(EvalError::static_err(format!("hex: unsupported argument type {}", other.type_tag()), line)),
    }
}

fn builtin_len(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let n = match &args[0] {
        Object::Str(s) => s.as_str().chars().count(),
        Object::Array(items) => items.len(),
        Object::Map(entries) => entries.borrow().len(),
        Object::Set(entries) => entries.borrow().len(),
        other => return Err(EvalError::static_err(format!("len: unsupported argument type {}", other.type_tag()), line)),
    };
    Ok(Flow::Value(Object::Int(n as i64)))
}

fn builtin_set(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let mut entries = HashMap::new();
    let mut insert = |v: Object, entries: &mut HashMap<HashKey, Object>| -> Result<(), EvalError> {
        let key = v
            .hash_key()
            .ok_or_else(|| EvalError::runtime(RuntimeErrorKind::Type, format!("set: unhashable value of type {}", v.type_tag()), line))?;
        entries.insert(key, v);
        Ok(())
    };
    for arg in args {
        match arg {
            Object::Array(items) => {
                for item in items.iter() {
                    insert(item.clone(), &mut entries)?;
                }
            }
            Object::Set(items) => {
                for item in items.borrow().values() {
                    insert(item.clone(), &mut entries)?;
                }
            }
            other => insert(other, &mut entries)?,
        }
    }
    Ok(Flow::Value(Object::new_set(entries)))
}

fn builtin_type(_ev: &mut Evaluator, args: Vec<Object>, _line: usize) -> super::EvalResult {
    Ok(Flow::Value(Object::Type(args[0].type_tag())))
}

fn builtin_print(_ev: &mut Evaluator, args: Vec<Object>, _line: usize) -> super::EvalResult {
    let rendered: Vec<String> = args.iter().map(|a| a.inspect()).collect();
    println!("{}", rendered.join(" "));
    Ok(Flow::Value(Object::Null))
}

fn loosely_equal(a: &Object, b: &Object) -> bool {
    a.type_tag() == b.type_tag() && super::values_equal(a, b, 0).unwrap_or(false)
}

fn builtin_contains(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let found = match &args[0] {
        Object::Array(items) => items.iter().any(|item| loosely_equal(item, &args[1])),
        Object::Map(entries) => {
            let key = args[1]
                .hash_key()
                .ok_or_else(|| EvalError::runtime(RuntimeErrorKind::Type, format!("contains: unhashable key type {}", args[1].type_tag()), line))?;
            entries.borrow().contains_key(&key)
        }
        Object::Set(entries) => {
            let key = args[1]
                .hash_key()
                .ok_or_else(|| EvalError::runtime(RuntimeErrorKind::Type, format!("contains: unhashable value type {}", args[1].type_tag()), line))?;
            entries.borrow().contains_key(&key)
        }
        other => return Err(EvalError::static_err(format!("contains: unsupported receiver type {}", other.type_tag()), line)),
    };
    Ok(Flow::Value(Object::Bool(found)))
}

fn builtin_open(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let path = expect_str(&args[0], "open", line)?;
    let kind = expect_str(&args[1], "open", line)?;

    let metadata = fs::metadata(path).map_err(|e| EvalError::runtime(RuntimeErrorKind::File, format!("open: {e}"), line))?;
    let bytes = fs::read(path).map_err(|e| EvalError::runtime(RuntimeErrorKind::File, format!("open: {e}"), line))?;
    let origin = Origin {
        path: std::path::PathBuf::from(path),
        permissions: metadata.permissions(),
    };

    let value = match kind {
        "hex" => {
            let text = String::from_utf8(bytes).map_err(|e| EvalError::runtime(RuntimeErrorKind::Hex, format!("open: {e}"), line))?;
            let mut hex = HexFile::parse(&text).map_err(|e| EvalError::runtime(RuntimeErrorKind::Hex, e.to_string(), line))?;
            hex.set_origin(origin);
            Object::HexFile(Rc::new(std::cell::RefCell::new(hex)))
        }
        "elf" => {
            let mut elf = ElfFile::parse(bytes).map_err(|e| EvalError::runtime(RuntimeErrorKind::Elf, e.to_string(), line))?;
            elf.set_origin(origin);
            Object::ElfFile(Rc::new(std::cell::RefCell::new(elf)))
        }
        "bytes" => {
            let mut file = BytesFile::new(bytes);
            file.set_origin(origin);
            Object::BytesFile(Rc::new(std::cell::RefCell::new(file)))
        }
        other => {
            return Err(EvalError::static_err(format!("open: unknown file kind '{other}', expected hex/elf/bytes"), line));
        }
    };
    Ok(Flow::Value(value))
}

fn write_back(origin: &Option<Origin>, bytes: &[u8], line: usize) -> Result<(), EvalError> {
    let origin = origin
        .as_ref()
        .ok_or_else(|| EvalError::runtime(RuntimeErrorKind::File, "save: file was not opened from a path", line))?;
    fs::write(&origin.path, bytes).map_err(|e| EvalError::runtime(RuntimeErrorKind::File, format!("save: {e}"), line))?;
    fs::set_permissions(&origin.path, origin.permissions.clone())
        .map_err(|e| EvalError::runtime(RuntimeErrorKind::File, format!("save: {e}"), line))?;
    Ok(())
}

fn builtin_save(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    match &args[0] {
        Object::HexFile(hex) => {
            let hex = hex.borrow();
            write_back(&hex.origin, hex.save().as_bytes(), line)?;
        }
        Object::ElfFile(elf) => {
            let elf = elf.borrow();
            write_back(&elf.origin, elf.as_bytes(), line)?;
        }
        Object::BytesFile(file) => {
            let file = file.borrow();
            write_back(&file.origin, file.as_bytes(), line)?;
        }
        other => return Err(EvalError::static_err(format!("save: unsupported argument type {}", other.type_tag()), line)),
    }
    Ok(Flow::Value(Object::Null))
}

fn builtin_as_bytes(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let bytes = match &args[0] {
        Object::HexFile(hex) => hex.borrow().data_bytes(),
        Object::ElfFile(elf) => elf.borrow().as_bytes().to_vec(),
        Object::BytesFile(file) => file.borrow().as_bytes().to_vec(),
        other => return Err(EvalError::static_err(format!("as_bytes: unsupported argument type {}", other.type_tag()), line)),
    };
    Ok(Flow::Value(array_from_bytes(&bytes)))
}

static BUILTINS: Lazy<Vec<Builtin>> = Lazy::new(|| {
    vec![
        Builtin {
            name: "hex",
            schema: vec![ArgSchema::OneOf(vec![TypeTag::Int, TypeTag::Str])],
            func: builtin_hex,
        },
        Builtin {
            name: "len",
            schema: vec![ArgSchema::OneOf(vec![TypeTag::Str, TypeTag::Array, TypeTag::Map, TypeTag::Set])],
            func: builtin_len,
        },
        Builtin {
            name: "set",
            schema: vec![ArgSchema::AnyVarargs],
            func: builtin_set,
        },
        Builtin {
            name: "type",
            schema: vec![ArgSchema::Any],
            func: builtin_type,
        },
        Builtin {
            name: "print",
            schema: vec![ArgSchema::AnyVarargs],
            func: builtin_print,
        },
        Builtin {
            name: "contains",
            schema: vec![ArgSchema::OneOf(vec![TypeTag::Array, TypeTag::Map, TypeTag::Set]), ArgSchema::Any],
            func: builtin_contains,
        },
        Builtin {
            name: "open",
            schema: vec![ArgSchema::Concrete(TypeTag::Str), ArgSchema::Concrete(TypeTag::Str)],
            func: builtin_open,
        },
        Builtin {
            name: "save",
            schema: vec![ArgSchema::OneOf(vec![TypeTag::HexFile, TypeTag::ElfFile, TypeTag::BytesFile])],
            func: builtin_save,
        },
        Builtin {
            name: "as_bytes",
            schema: vec![ArgSchema::OneOf(vec![TypeTag::HexFile, TypeTag::ElfFile, TypeTag::BytesFile])],
            func: builtin_as_bytes,
        },
    ]
});

/// Installs every free-standing builtin into `env` (spec.md §9's
/// "global builtin tables ... built once at startup").
pub fn install(env: &Env) {
    for builtin in BUILTINS.iter() {
        env.borrow_mut().set(builtin.name, Object::Builtin(Rc::new(builtin.clone())));
    }
}

pub(super) fn expect_int_arg(obj: &Object, name: &str, line: usize) -> Result<i64, EvalError> {
    expect_int(obj, name, line)
}
pub(super) fn expect_str_arg<'a>(obj: &'a Object, name: &str, line: usize) -> Result<&'a str, EvalError> {
    expect_str(obj, name, line)
}
pub(super) fn bytes_from_array_arg(obj: &Object, name: &str, line: usize) -> Result<Vec<u8>, EvalError> {
    bytes_from_array(obj, name, line)
}
pub(super) fn array_from_bytes_val(bytes: &[u8]) -> Object {
    array_from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_of_int_formats_lowercase() {
        let mut ev = Evaluator::new();
        let result = builtin_hex(&mut ev, vec![Object::Int(255)], 1).unwrap().into_value();
        match result {
            Object::Str(s) => assert_eq!(s.as_str(), "0xff"),
            other => panic!("expected str, got {other:?}"),
        }
    }

    #[test]
    fn hex_of_string_decodes_bytes() {
        let mut ev = Evaluator::new();
        let result = builtin_hex(&mut ev, vec![Object::new_str("ffab21")], 1).unwrap().into_value();
        match result {
            Object::Array(items) => {
                assert_eq!(items.len(), 3);
                assert!(matches!(items[0], Object::Int(0xff)));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn set_unpacks_arrays_and_dedupes() {
        let mut ev = Evaluator::new();
        let arr = Object::new_array(vec![Object::Int(1), Object::Int(2), Object::Int(2)]);
        let result = builtin_set(&mut ev, vec![arr], 1).unwrap().into_value();
        match result {
            Object::Set(entries) => assert_eq!(entries.borrow().len(), 2),
            other => panic!("expected set, got {other:?}"),
        }
    }

    #[test]
    fn schema_rejects_wrong_type() {
        let builtin = BUILTINS.iter().find(|b| b.name == "len").unwrap();
        assert!(check_schema(builtin, &[Object::Int(1)], 1).is_err());
    }

    #[test]
    fn varargs_schema_accepts_any_count() {
        let builtin = BUILTINS.iter().find(|b| b.name == "print").unwrap();
        assert!(check_schema(builtin, &[], 1).is_ok());
        assert!(check_schema(builtin, &[Object::Int(1), Object::Bool(true)], 1).is_ok());
    }
}

//! Per-type method dispatch tables (spec.md §4.3, §4.4).
//!
//! A method call looks up `(receiver type tag, method name)` in a
//! table built once behind a `once_cell::Lazy`, exactly like the
//! free-standing builtin table in [`super::builtins`] (spec.md §9).
//! The receiver is prepended to the argument list before the schema
//! check and the native function run, mirroring how `Evaluator::call`
//! handles an already-constructed `Object::Method` value.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::object::{ArgSchema, Builtin, Object, TypeTag};

use super::builtins::{array_from_bytes_val, bytes_from_array_arg, check_schema, expect_int_arg, expect_str_arg};
use super::{EvalError, Evaluator, Flow, RuntimeErrorKind};

fn array_push(_ev: &mut Evaluator, args: Vec<Object>, _line: usize) -> super::EvalResult {
    let Object::Array(items) = &args[0] else { unreachable!("dispatched by type tag") };
    let mut items = (**items).clone();
    items.push(args[1].clone());
    Ok(Flow::Value(Object::new_array(items)))
}

fn array_pop(_ev: &mut Evaluator, args: Vec<Object>, _line: usize) -> super::EvalResult {
    let Object::Array(items) = &args[0] else { unreachable!("dispatched by type tag") };
    let mut items = (**items).clone();
    items.pop();
    Ok(Flow::Value(Object::new_array(items)))
}

fn array_slice(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::Array(items) = &args[0] else { unreachable!("dispatched by type tag") };
    let start = expect_int_arg(&args[1], "slice", line)?;
    let end = expect_int_arg(&args[2], "slice", line)?;
    let len = items.len() as i64;
    if start < 0 || start >= len || end <= 0 || end > len || end <= start {
        return Err(EvalError::runtime(
            RuntimeErrorKind::Key,
            format!("slice bounds [{start}, {end}) out of range for length {len}"),
            line,
        ));
    }
    Ok(Flow::Value(Object::new_array(items[start as usize..end as usize].to_vec())))
}

fn array_map(ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::Array(items) = &args[0] else { unreachable!("dispatched by type tag") };
    let func = args[1].clone();
    let mut mapped = Vec::with_capacity(items.len());
    for item in items.iter() {
        mapped.push(ev.call(func.clone(), vec![item.clone()], line)?);
    }
    Ok(Flow::Value(Object::new_array(mapped)))
}

fn array_reduce(ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::Array(items) = &args[0] else { unreachable!("dispatched by type tag") };
    let func = args[1].clone();
    let mut iter = items.iter().cloned();
    let mut acc = match args.get(2) {
        Some(init) => init.clone(),
        None => iter
            .next()
            .ok_or_else(|| EvalError::runtime(RuntimeErrorKind::Type, "reduce: empty array requires an initial value", line))?,
    };
    for item in iter {
        acc = ev.call(func.clone(), vec![acc, item], line)?;
    }
    Ok(Flow::Value(acc))
}

fn map_set(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::Map(entries) = &args[0] else { unreachable!("dispatched by type tag") };
    let key = args[1]
        .hash_key()
        .ok_or_else(|| EvalError::runtime(RuntimeErrorKind::Type, format!("map.set: unhashable key type {}", args[1].type_tag()), line))?;
    entries.borrow_mut().insert(key, (args[1].clone(), args[2].clone()));
    Ok(Flow::Value(Object::Null))
}

fn map_pop(_ev: &mut Evaluator, args: Vec<Object>, _line: usize) -> super::EvalResult {
    let Object::Map(entries) = &args[0] else { unreachable!("dispatched by type tag") };
    if let Some(key) = args[1].hash_key() {
        entries.borrow_mut().remove(&key);
    }
    Ok(Flow::Value(Object::Null))
}

fn set_add(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::Set(entries) = &args[0] else { unreachable!("dispatched by type tag") };
    let key = args[1]
        .hash_key()
        .ok_or_else(|| EvalError::runtime(RuntimeErrorKind::Type, format!("set.add: unhashable value type {}", args[1].type_tag()), line))?;
    entries.borrow_mut().insert(key, args[1].clone());
    Ok(Flow::Value(Object::Null))
}

fn set_remove(_ev: &mut Evaluator, args: Vec<Object>, _line: usize) -> super::EvalResult {
    let Object::Set(entries) = &args[0] else { unreachable!("dispatched by type tag") };
    if let Some(key) = args[1].hash_key() {
        entries.borrow_mut().remove(&key);
    }
    Ok(Flow::Value(Object::Null))
}

fn hex_record(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::HexFile(hex) = &args[0] else { unreachable!("dispatched by type tag") };
    let index = expect_int_arg(&args[1], "record", line)?;
    let hex = hex.borrow();
    let raw = hex
        .record(index as usize)
        .ok_or_else(|| EvalError::runtime(RuntimeErrorKind::Key, format!("no record at index {index}"), line))?;
    Ok(Flow::Value(Object::new_str(raw.to_string())))
}

fn hex_size(_ev: &mut Evaluator, args: Vec<Object>, _line: usize) -> super::EvalResult {
    let Object::HexFile(hex) = &args[0] else { unreachable!("dispatched by type tag") };
    Ok(Flow::Value(Object::Int(hex.borrow().size() as i64)))
}

fn hex_read_at(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::HexFile(hex) = &args[0] else { unreachable!("dispatched by type tag") };
    let pos = expect_int_arg(&args[1], "read_at", line)?;
    let n = expect_int_arg(&args[2], "read_at", line)?;
    if pos < 0 {
        return Err(EvalError::runtime(RuntimeErrorKind::Key, "read_at: negative position", line));
    }
    let bytes = hex
        .borrow()
        .read_at(pos as u64, n.max(0) as usize)
        .map_err(|e| EvalError::runtime(RuntimeErrorKind::Hex, e.to_string(), line))?;
    Ok(Flow::Value(array_from_bytes_val(&bytes)))
}

fn hex_write_at(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::HexFile(hex) = &args[0] else { unreachable!("dispatched by type tag") };
    let pos = expect_int_arg(&args[1], "write_at", line)?;
    if pos < 0 {
        return Err(EvalError::runtime(RuntimeErrorKind::Key, "write_at: negative position", line));
    }
    let bytes = bytes_from_array_arg(&args[2], "write_at", line)?;
    hex.borrow_mut()
        .write_at(pos as u64, &bytes)
        .map_err(|e| EvalError::runtime(RuntimeErrorKind::Hex, e.to_string(), line))?;
    Ok(Flow::Value(Object::Null))
}

fn elf_has_section(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::ElfFile(elf) = &args[0] else { unreachable!("dispatched by type tag") };
    let name = expect_str_arg(&args[1], "has_section", line)?;
    Ok(Flow::Value(Object::Bool(elf.borrow().has_section(name))))
}

fn elf_sections(_ev: &mut Evaluator, args: Vec<Object>, _line: usize) -> super::EvalResult {
    let Object::ElfFile(elf) = &args[0] else { unreachable!("dispatched by type tag") };
    let names = elf.borrow().sections().into_iter().map(Object::new_str).collect();
    Ok(Flow::Value(Object::new_array(names)))
}

fn elf_read_section(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::ElfFile(elf) = &args[0] else { unreachable!("dispatched by type tag") };
    let name = expect_str_arg(&args[1], "read_section", line)?;
    let bytes = elf.borrow().read_section(name).map_err(|e| EvalError::runtime(RuntimeErrorKind::Elf, e.to_string(), line))?;
    Ok(Flow::Value(array_from_bytes_val(&bytes)))
}

fn elf_write_section(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::ElfFile(elf) = &args[0] else { unreachable!("dispatched by type tag") };
    let name = expect_str_arg(&args[1], "write_section", line)?.to_string();
    let bytes = bytes_from_array_arg(&args[2], "write_section", line)?;
    let offset = expect_int_arg(&args[3], "write_section", line)?;
    if offset < 0 {
        return Err(EvalError::runtime(RuntimeErrorKind::Key, "write_section: negative offset", line));
    }
    elf.borrow_mut()
        .write_section(&name, &bytes, offset as u64)
        .map_err(|e| EvalError::runtime(RuntimeErrorKind::Elf, e.to_string(), line))?;
    Ok(Flow::Value(Object::Null))
}

fn bytesfile_read_at(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::BytesFile(file) = &args[0] else { unreachable!("dispatched by type tag") };
    let pos = expect_int_arg(&args[1], "read_at", line)?;
    let n = expect_int_arg(&args[2], "read_at", line)?;
    if pos < 0 {
        return Err(EvalError::runtime(RuntimeErrorKind::Key, "read_at: negative position", line));
    }
    let bytes = file
        .borrow()
        .read_at(pos as u64, n)
        .map_err(|e| EvalError::runtime(RuntimeErrorKind::Bytes, e.to_string(), line))?;
    Ok(Flow::Value(array_from_bytes_val(&bytes)))
}

fn bytesfile_write_at(_ev: &mut Evaluator, args: Vec<Object>, line: usize) -> super::EvalResult {
    let Object::BytesFile(file) = &args[0] else { unreachable!("dispatched by type tag") };
    let pos = expect_int_arg(&args[1], "write_at", line)?;
    if pos < 0 {
        return Err(EvalError::runtime(RuntimeErrorKind::Key, "write_at: negative position", line));
    }
    let bytes = bytes_from_array_arg(&args[2], "write_at", line)?;
    file.borrow_mut()
        .write_at(pos as u64, &bytes)
        .map_err(|e| EvalError::runtime(RuntimeErrorKind::Bytes, e.to_string(), line))?;
    Ok(Flow::Value(Object::Null))
}

static METHODS: Lazy<HashMap<(TypeTag, &'static str), Builtin>> = Lazy::new(|| {
    let int_ = ArgSchema::Concrete(TypeTag::Int);
    let str_ = ArgSchema::Concrete(TypeTag::Str);
    let arr_ = ArgSchema::Concrete(TypeTag::Array);
    let any = ArgSchema::Any;
    let mut m = HashMap::new();

    m.insert(
        (TypeTag::Array, "push"),
        Builtin { name: "push", schema: vec![any.clone(), any.clone()], func: array_push },
    );
    m.insert(
        (TypeTag::Array, "pop"),
        Builtin { name: "pop", schema: vec![any.clone()], func: array_pop },
    );
    m.insert(
        (TypeTag::Array, "slice"),
        Builtin { name: "slice", schema: vec![any.clone(), int_.clone(), int_.clone()], func: array_slice },
    );
    m.insert(
        (TypeTag::Array, "map"),
        Builtin {
            name: "map",
            schema: vec![any.clone(), ArgSchema::Concrete(TypeTag::Function)],
            func: array_map,
        },
    );
    m.insert(
        (TypeTag::Array, "reduce"),
        Builtin {
            name: "reduce",
            schema: vec![any.clone(), ArgSchema::Concrete(TypeTag::Function), ArgSchema::AnyOptional],
            func: array_reduce,
        },
    );

    m.insert(
        (TypeTag::Map, "set"),
        Builtin { name: "set", schema: vec![any.clone(), any.clone(), any.clone()], func: map_set },
    );
    m.insert(
        (TypeTag::Map, "pop"),
        Builtin { name: "pop", schema: vec![any.clone(), any.clone()], func: map_pop },
    );

    m.insert(
        (TypeTag::Set, "add"),
        Builtin { name: "add", schema: vec![any.clone(), any.clone()], func: set_add },
    );
    m.insert(
        (TypeTag::Set, "remove"),
        Builtin { name: "remove", schema: vec![any.clone(), any.clone()], func: set_remove },
    );

    m.insert(
        (TypeTag::HexFile, "record"),
        Builtin { name: "record", schema: vec![any.clone(), int_.clone()], func: hex_record },
    );
    m.insert(
        (TypeTag::HexFile, "size"),
        Builtin { name: "size", schema: vec![any.clone()], func: hex_size },
    );
    m.insert(
        (TypeTag::HexFile, "read_at"),
        Builtin { name: "read_at", schema: vec![any.clone(), int_.clone(), int_.clone()], func: hex_read_at },
    );
    m.insert(
        (TypeTag::HexFile, "write_at"),
        Builtin { name: "write_at", schema: vec![any.clone(), int_.clone(), arr_.clone()], func: hex_write_at },
    );

    m.insert(
        (TypeTag::ElfFile, "has_section"),
        Builtin { name: "has_section", schema: vec![any.clone(), str_.clone()], func: elf_has_section },
    );
    m.insert(
        (TypeTag::ElfFile, "sections"),
        Builtin { name: "sections", schema: vec![any.clone()], func: elf_sections },
    );
    m.insert(
        (TypeTag::ElfFile, "read_section"),
        Builtin { name: "read_section", schema: vec![any.clone(), str_.clone()], func: elf_read_section },
    );
    m.insert(
        (TypeTag::ElfFile, "write_section"),
        Builtin {
            name: "write_section",
            schema: vec![any.clone(), str_.clone(), arr_.clone(), int_.clone()],
            func: elf_write_section,
        },
    );

    m.insert(
        (TypeTag::BytesFile, "read_at"),
        Builtin { name: "read_at", schema: vec![any.clone(), int_.clone(), int_.clone()], func: bytesfile_read_at },
    );
    m.insert(
        (TypeTag::BytesFile, "write_at"),
        Builtin { name: "write_at", schema: vec![any, int_, arr_], func: bytesfile_write_at },
    );

    m
});

/// Looks up and invokes a method builtin for `receiver`, prepending
/// it to `args` before the schema check and the call (spec.md §4.3's
/// "method call looks up the method name in a per-type dispatch
/// table").
pub fn dispatch(ev: &mut Evaluator, receiver: Object, name: &str, args: Vec<Object>, line: usize) -> Result<Object, EvalError> {
    let tag = receiver.type_tag();
    let builtin = METHODS
        .get(&(tag, name))
        .ok_or_else(|| EvalError::static_err(format!("{tag} has no method '{name}'"), line))?;

    let mut full_args = Vec::with_capacity(args.len() + 1);
    full_args.push(receiver);
    full_args.extend(args);

    check_schema(builtin, &full_args, line)?;
    Ok((builtin.func)(ev, full_args, line)?.into_value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_push_returns_fresh_array() {
        let mut ev = Evaluator::new();
        let original = Object::new_array(vec![Object::Int(1)]);
        let result = dispatch(&mut ev, original.clone(), "push", vec![Object::Int(2)], 1).unwrap();
        match (&original, &result) {
            (Object::Array(orig), Object::Array(pushed)) => {
                assert_eq!(orig.len(), 1);
                assert_eq!(pushed.len(), 2);
            }
            _ => panic!("expected arrays"),
        }
    }

    #[test]
    fn unknown_method_errors() {
        let mut ev = Evaluator::new();
        assert!(dispatch(&mut ev, Object::Int(1), "push", vec![], 1).is_err());
    }
}

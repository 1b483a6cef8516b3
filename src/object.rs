//! The polymorphic runtime value (spec.md §3.3).
//!
//! Re-architected per spec.md §9: dynamic typing + "reflection" on
//! values becomes one tagged enum with an arm per concrete type;
//! method dispatch is a table indexed by `(type tag, method name)`
//! built once at startup (see `eval::methods`); mutable-looking values
//! (`Map`, `Set`, `HexFile`, `ElfFile`, `BytesFile`) live behind
//! `Rc<RefCell<...>>` handles so mutating methods can write through a
//! shared reference without requiring unsafe code or a GC.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Statement;
use crate::bytesfile::BytesFile;
use crate::elf::ElfFile;
use crate::environment::Env;
use crate::eval::error::RuntimeError;
use crate::hex::HexFile;

/// The type tag surfaced to scripts by the `type` builtin, and the key
/// used by the per-type method dispatch tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Bool,
    Int,
    Str,
    Type,
    Array,
    Map,
    Set,
    Function,
    Builtin,
    Method,
    RuntimeError,
    HexFile,
    ElfFile,
    BytesFile,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Str => "str",
            TypeTag::Type => "type",
            TypeTag::Array => "array",
            TypeTag::Map => "map",
            TypeTag::Set => "set",
            TypeTag::Function => "function",
            TypeTag::Builtin => "builtin",
            TypeTag::Method => "method",
            TypeTag::RuntimeError => "error",
            TypeTag::HexFile => "hexfile",
            TypeTag::ElfFile => "elffile",
            TypeTag::BytesFile => "bytesfile",
        };
        f.write_str(name)
    }
}

/// `(type-tag, 64-bit value)` hash key for hashable objects
/// (`Int`/`Bool`/`Str` only, spec.md §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub tag: TypeTag,
    pub value: u64,
}

/// Stable, non-cryptographic 64-bit hash (FNV-1a) used for string hash
/// keys. Not meant to survive across process runs, only within one
/// (spec.md §3.3).
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HarlockStr(pub Rc<String>);

impl HarlockStr {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Rc::new(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub type MapEntries = Rc<RefCell<HashMap<HashKey, (Object, Object)>>>;
pub type SetEntries = Rc<RefCell<HashMap<HashKey, Object>>>;

#[derive(Clone)]
pub struct Function {
    pub params: Vec<String>,
    pub body: Rc<Statement>,
    pub env: Env,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("params", &self.params).finish()
    }
}

/// One argument slot in a builtin's type schema (spec.md §4.4).
#[derive(Debug, Clone)]
pub enum ArgSchema {
    Concrete(TypeTag),
    OneOf(Vec<TypeTag>),
    Any,
    AnyVarargs,
    AnyOptional,
}

pub type NativeFn = fn(&mut crate::eval::Evaluator, Vec<Object>, usize) -> crate::eval::EvalResult;

#[derive(Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub schema: Vec<ArgSchema>,
    pub func: NativeFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

#[derive(Clone)]
pub struct Method {
    pub receiver: Box<Object>,
    pub builtin: Builtin,
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method").field("name", &self.builtin.name).finish()
    }
}

/// Harlock's runtime value. See spec.md §3.3 for the full variant
/// rationale; `ReturnValue` is deliberately absent here because it is
/// modeled as `eval::Flow::Return` instead (spec.md §9's suggested
/// re-architecture of the return/try control flow as a sum-typed
/// evaluation result, not as a value variant).
#[derive(Clone)]
pub enum Object {
    Null,
    Bool(bool),
    Int(i64),
    Str(HarlockStr),
    Type(TypeTag),
    Array(Rc<Vec<Object>>),
    Map(MapEntries),
    Set(SetEntries),
    Function(Rc<Function>),
    Builtin(Rc<Builtin>),
    Method(Rc<Method>),
    RuntimeError(Rc<RuntimeError>),
    HexFile(Rc<RefCell<HexFile>>),
    ElfFile(Rc<RefCell<ElfFile>>),
    BytesFile(Rc<RefCell<BytesFile>>),
}

impl Object {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Object::Null => TypeTag::Null,
            Object::Bool(_) => TypeTag::Bool,
            Object::Int(_) => TypeTag::Int,
            Object::Str(_) => TypeTag::Str,
            Object::Type(_) => TypeTag::Type,
            Object::Array(_) => TypeTag::Array,
            Object::Map(_) => TypeTag::Map,
            Object::Set(_) => TypeTag::Set,
            Object::Function(_) => TypeTag::Function,
            Object::Builtin(_) => TypeTag::Builtin,
            Object::Method(_) => TypeTag::Method,
            Object::RuntimeError(_) => TypeTag::RuntimeError,
            Object::HexFile(_) => TypeTag::HexFile,
            Object::ElfFile(_) => TypeTag::ElfFile,
            Object::BytesFile(_) => TypeTag::BytesFile,
        }
    }

    /// `false` only for `Null` and `Bool(false)` (spec.md §4.3);
    /// empty collections are truthy, preserved verbatim per the open
    /// question in spec.md §9.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Null | Object::Bool(false))
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Object::Int(v) => Some(HashKey {
                tag: TypeTag::Int,
                value: *v as u64,
            }),
            Object::Bool(v) => Some(HashKey {
                tag: TypeTag::Bool,
                value: if *v { 1 } else { 0 },
            }),
            Object::Str(s) => Some(HashKey {
                tag: TypeTag::Str,
                value: fnv1a(s.as_str().as_bytes()),
            }),
            _ => None,
        }
    }

    pub fn new_str(s: impl Into<String>) -> Object {
        Object::Str(HarlockStr::new(s))
    }

    pub fn new_array(items: Vec<Object>) -> Object {
        Object::Array(Rc::new(items))
    }

    pub fn new_map(entries: HashMap<HashKey, (Object, Object)>) -> Object {
        Object::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn new_set(entries: HashMap<HashKey, Object>) -> Object {
        Object::Set(Rc::new(RefCell::new(entries)))
    }

    /// Human-readable rendering used by `print` and error messages;
    /// corresponds to the teacher-idiom "inspect" string used by most
    /// tree-walking interpreters in this family.
    pub fn inspect(&self) -> String {
        match self {
            Object::Null => "null".to_string(),
            Object::Bool(v) => v.to_string(),
            Object::Int(v) => v.to_string(),
            Object::Str(s) => s.as_str().to_string(),
            Object::Type(t) => t.to_string(),
            Object::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|o| o.inspect_nested()).collect();
                format!("[{}]", rendered.join(", "))
            }
            Object::Map(entries) => {
                let rendered: Vec<String> = entries
                    .borrow()
                    .values()
                    .map(|(k, v)| format!("{}: {}", k.inspect_nested(), v.inspect_nested()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Object::Set(entries) => {
                let rendered: Vec<String> = entries.borrow().values().map(|v| v.inspect_nested()).collect();
                format!("set({})", rendered.join(", "))
            }
            Object::Function(_) => "<function>".to_string(),
            Object::Builtin(b) => format!("<builtin {}>", b.name),
            Object::Method(m) => format!("<method {}>", m.builtin.name),
            Object::RuntimeError(e) => format!("{e}"),
            Object::HexFile(_) => "<hexfile>".to_string(),
            Object::ElfFile(_) => "<elffile>".to_string(),
            Object::BytesFile(_) => "<bytesfile>".to_string(),
        }
    }

    fn inspect_nested(&self) -> String {
        match self {
            Object::Str(s) => format!("\"{}\"", s.as_str()),
            other => other.inspect(),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_tag(), self.inspect())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

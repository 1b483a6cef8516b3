//! Lexically scoped environment frames (spec.md §3.4).
//!
//! Re-architected per spec.md §9: closures capturing environments
//! become a frame behind a shared, reference-counted, interior-mutable
//! handle (`Rc<RefCell<Environment>>`) with an optional parent handle;
//! a `Function` value holds a clone of the handle active at the point
//! of its literal, and frames are reclaimed once nothing references
//! them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Object;

pub type Env = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    store: HashMap<String, Object>,
    outer: Option<Env>,
}

impl Environment {
    pub fn new() -> Env {
        Rc::new(RefCell::new(Environment::default()))
    }

    pub fn enclosed(outer: &Env) -> Env {
        Rc::new(RefCell::new(Environment {
            store: HashMap::new(),
            outer: Some(Rc::clone(outer)),
        }))
    }

    /// Walk the chain from this frame outward.
    pub fn get(&self, name: &str) -> Option<Object> {
        if let Some(value) = self.store.get(name) {
            return Some(value.clone());
        }
        match &self.outer {
            Some(outer) => outer.borrow().get(name),
            None => None,
        }
    }

    /// `var` always writes the innermost frame (spec.md §3.4).
    pub fn set(&mut self, name: impl Into<String>, value: Object) {
        self.store.insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outer_chain() {
        let outer = Environment::new();
        outer.borrow_mut().set("x", Object::Int(42));

        let inner = Environment::enclosed(&outer);
        assert!(matches!(inner.borrow().get("x"), Some(Object::Int(42))));
    }

    #[test]
    fn set_always_writes_innermost_frame() {
        let outer = Environment::new();
        outer.borrow_mut().set("x", Object::Int(1));

        let inner = Environment::enclosed(&outer);
        inner.borrow_mut().set("x", Object::Int(2));

        assert!(matches!(inner.borrow().get("x"), Some(Object::Int(2))));
        assert!(matches!(outer.borrow().get("x"), Some(Object::Int(1))));
    }
}

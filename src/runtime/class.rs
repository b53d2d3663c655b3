use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Statement;
use crate::runtime::error::{ExecResult, RuntimeError};
use crate::runtime::object::{Closure, Context, ObjectHolder};

pub const INIT_METHOD: &str = "__init__";
pub const STR_METHOD: &str = "__str__";
pub const EQ_METHOD: &str = "__eq__";
pub const LT_METHOD: &str = "__lt__";
pub const ADD_METHOD: &str = "__add__";

/// The name the receiver is bound to inside a method body.
const SELF_NAME: &str = "self";

#[derive(Debug)]
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    pub body: Statement,
}

/// A user-defined class: a name, an optional parent, and the method lookup
/// table. The vtable starts as a copy of the parent's entries and is then
/// overlaid with the class's own methods, so a same-named method overrides
/// the inherited one. Entries are shared with the defining class, which keeps
/// them alive for as long as any class in the hierarchy is.
#[derive(Debug)]
pub struct Class {
    name: String,
    vtable: HashMap<String, Rc<Method>>,
    parent: Option<Rc<Class>>,
}

impl Class {
    pub fn new(name: String, methods: Vec<Method>, parent: Option<Rc<Class>>) -> Self {
        let mut vtable = match &parent {
            Some(parent) => parent.vtable.clone(),
            None => HashMap::new(),
        };
        for method in methods {
            vtable.insert(method.name.clone(), Rc::new(method));
        }
        Self {
            name,
            vtable,
            parent,
        }
    }

    pub fn get_method(&self, name: &str) -> Option<&Rc<Method>> {
        self.vtable.get(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }
}

/// A heap object of a user-defined class. Fields live in the instance's own
/// closure and come into existence on first assignment.
#[derive(Debug)]
pub struct ClassInstance {
    class: Rc<Class>,
    fields: Closure,
}

impl ClassInstance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: Closure::new(),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn fields(&self) -> &Closure {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Closure {
        &mut self.fields
    }

    /// True when the class hierarchy defines `method` taking exactly
    /// `argument_count` arguments (the receiver not counted).
    pub fn has_method(&self, method: &str, argument_count: usize) -> bool {
        self.class
            .get_method(method)
            .is_some_and(|method| method.formal_params.len() == argument_count)
    }

    /// Invokes `method` on the instance held by `receiver`.
    ///
    /// The call scope binds `self` to a borrowing alias of the receiver plus
    /// one entry per formal parameter; the borrow is safe because `receiver`
    /// stays on the caller's stack for the whole call.
    pub fn call(
        receiver: &ObjectHolder,
        method: &str,
        actual_args: &[ObjectHolder],
        context: &mut dyn Context,
    ) -> ExecResult {
        let resolved = receiver
            .with_instance(|instance| {
                let class = instance.class();
                match class.get_method(method) {
                    Some(found) if found.formal_params.len() == actual_args.len() => {
                        Ok(Rc::clone(found))
                    }
                    Some(found) => Err(RuntimeError::MethodArityMismatch {
                        method: method.to_string(),
                        expected: found.formal_params.len(),
                        found: actual_args.len(),
                    }),
                    None => Err(RuntimeError::UnknownMethod {
                        method: method.to_string(),
                        class: class.name().to_string(),
                    }),
                }
            })
            .unwrap_or_else(|| {
                Err(RuntimeError::UnknownMethod {
                    method: method.to_string(),
                    class: receiver.type_name().to_string(),
                })
            })?;

        let mut closure = Closure::new();
        closure.insert(SELF_NAME.to_string(), receiver.share());
        for (param, value) in resolved.formal_params.iter().zip(actual_args) {
            closure.insert(param.clone(), value.clone());
        }
        resolved.body.execute(&mut closure, context)
    }
}

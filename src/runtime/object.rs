use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::{Rc, Weak};

use crate::runtime::class::{Class, ClassInstance, STR_METHOD};
use crate::runtime::error::{RuntimeError, Signal};

/// A lexical scope: names mapped to the values they are bound to. Top-level
/// scope, per-call method scopes, and instance field storage are all
/// closures.
pub type Closure = HashMap<String, ObjectHolder>;

/// Host-supplied services threaded through every `execute` call. The only
/// service is the output sink `print` writes to.
pub trait Context {
    fn output_stream(&mut self) -> &mut dyn Write;
}

/// The one [`Context`] implementation: wraps any writer. The CLI wraps
/// stdout; `str(...)` and the tests wrap a `Vec<u8>` and recover it with
/// [`StreamContext::into_inner`].
pub struct StreamContext<W> {
    output: W,
}

impl<W: Write> StreamContext<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

impl<W: Write> Context for StreamContext<W> {
    fn output_stream(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}

/// A dynamically typed Mython value. The *absent* value has no variant here;
/// it is an [`ObjectHolder`] in its empty mode.
#[derive(Debug)]
pub enum Value {
    Number(i32),
    String(String),
    Bool(bool),
    Class(Rc<Class>),
    Instance(ClassInstance),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Bool(_) => "Bool",
            Value::Class(_) => "Class",
            Value::Instance(_) => "ClassInstance",
        }
    }
}

/// The runtime's uniform reference to a value.
///
/// Owning holders share the heap value through a reference count; borrowing
/// holders alias it without contributing to its lifetime and are only handed
/// out where an owning holder is guaranteed to outlive them (`self` inside a
/// method call). The empty holder stands for the absent value.
#[derive(Debug, Clone, Default)]
pub struct ObjectHolder {
    data: HolderData,
}

#[derive(Debug, Clone, Default)]
enum HolderData {
    Own(Rc<RefCell<Value>>),
    Share(Weak<RefCell<Value>>),
    #[default]
    None,
}

impl ObjectHolder {
    /// Moves `value` to the heap and takes ownership of it.
    pub fn own(value: Value) -> Self {
        Self {
            data: HolderData::Own(Rc::new(RefCell::new(value))),
        }
    }

    /// A borrowing alias of the same value. The owner must stay alive for as
    /// long as the alias is dereferenced.
    pub fn share(&self) -> Self {
        let data = match &self.data {
            HolderData::Own(cell) => HolderData::Share(Rc::downgrade(cell)),
            HolderData::Share(cell) => HolderData::Share(Weak::clone(cell)),
            HolderData::None => HolderData::None,
        };
        Self { data }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.data, HolderData::None)
    }

    fn cell(&self) -> Option<Rc<RefCell<Value>>> {
        match &self.data {
            HolderData::Own(cell) => Some(Rc::clone(cell)),
            HolderData::Share(cell) => {
                Some(cell.upgrade().expect("borrowed value outlived its owner"))
            }
            HolderData::None => None,
        }
    }

    /// The `IsTrue` predicate.
    pub fn is_true(&self) -> bool {
        let Some(cell) = self.cell() else {
            return false;
        };
        let value = cell.borrow();
        match &*value {
            Value::Number(number) => *number != 0,
            Value::Bool(flag) => *flag,
            Value::String(text) => !text.is_empty(),
            Value::Instance(_) => true,
            Value::Class(_) => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.cell() {
            Some(cell) => {
                let value = cell.borrow();
                value.type_name()
            }
            None => "None",
        }
    }

    pub fn as_number(&self) -> Option<i32> {
        let cell = self.cell()?;
        let value = cell.borrow();
        match &*value {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        let cell = self.cell()?;
        let value = cell.borrow();
        match &*value {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        let cell = self.cell()?;
        let value = cell.borrow();
        match &*value {
            Value::String(text) => Some(text.clone()),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<Rc<Class>> {
        let cell = self.cell()?;
        let value = cell.borrow();
        match &*value {
            Value::Class(class) => Some(Rc::clone(class)),
            _ => None,
        }
    }

    pub fn is_instance(&self) -> bool {
        self.with_instance(|_| ()).is_some()
    }

    /// Runs `f` against the held class instance, or returns `None` when the
    /// holder is empty or holds something else. The instance stays borrowed
    /// only for the duration of `f`; callers must not execute statements
    /// from inside it.
    pub fn with_instance<R>(&self, f: impl FnOnce(&ClassInstance) -> R) -> Option<R> {
        let cell = self.cell()?;
        let value = cell.borrow();
        match &*value {
            Value::Instance(instance) => Some(f(instance)),
            _ => None,
        }
    }

    pub fn with_instance_mut<R>(&self, f: impl FnOnce(&mut ClassInstance) -> R) -> Option<R> {
        let cell = self.cell()?;
        let mut value = cell.borrow_mut();
        match &mut *value {
            Value::Instance(instance) => Some(f(instance)),
            _ => None,
        }
    }

    /// Writes the printed representation to the context's output stream. An
    /// empty holder prints as `None`; an instance defers to its `__str__`
    /// method when one is defined, and otherwise prints an opaque identity.
    pub fn print(&self, context: &mut dyn Context) -> Result<(), Signal> {
        let Some(cell) = self.cell() else {
            return Ok(write_output(context, "None")?);
        };
        let rendered = {
            let value = cell.borrow();
            match &*value {
                Value::Number(number) => Some(number.to_string()),
                Value::Bool(true) => Some("True".to_string()),
                Value::Bool(false) => Some("False".to_string()),
                Value::String(text) => Some(text.clone()),
                Value::Class(class) => Some(format!("Class {}", class.name())),
                Value::Instance(instance) => {
                    if instance.has_method(STR_METHOD, 0) {
                        None
                    } else {
                        Some(format!("{:p}", Rc::as_ptr(&cell)))
                    }
                }
            }
        };
        match rendered {
            Some(text) => Ok(write_output(context, &text)?),
            None => {
                let result = ClassInstance::call(self, STR_METHOD, &[], context)?;
                result.print(context)
            }
        }
    }
}

pub(crate) fn write_output(context: &mut dyn Context, text: &str) -> Result<(), RuntimeError> {
    write!(context.output_stream(), "{text}").map_err(RuntimeError::from)
}

pub(crate) fn write_output_newline(context: &mut dyn Context) -> Result<(), RuntimeError> {
    writeln!(context.output_stream()).map_err(RuntimeError::from)
}

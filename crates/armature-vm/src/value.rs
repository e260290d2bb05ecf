//! Runtime value representation.
//!
//! Values are a tagged union over the four payload kinds the VM manipulates:
//! numbers, strings, scripted subroutines (bytecode buffers) and host-supplied
//! native callbacks. No implicit coercion exists between variants; type
//! mismatches fault the executing instruction.

use std::fmt;
use std::rc::Rc;

use crate::stack::OperandStack;

/// Host callback signature.
///
/// A native receives the operand stack (arguments on top, caller order
/// preserved) and returns the number of result values it produced. The count
/// is a convention between host and script; the VM reports it through
/// [`Vm::call`](crate::Vm::call) but does not validate it.
pub type NativeFn = Rc<dyn Fn(&mut OperandStack) -> i32>;

/// A tagged runtime value.
///
/// Cloning copies strings, and bumps the reference count for bytecode and
/// native payloads.
#[derive(Clone)]
pub enum Value {
    /// IEEE-754 single-precision number.
    Number(f32),
    /// Owned immutable string, UTF-8 by convention.
    Str(String),
    /// Scripted subroutine: an owned instruction buffer, invokable by `JSR`.
    Bytecode(Rc<[u8]>),
    /// Host-supplied callback, invokable by `JSR`.
    Native(NativeFn),
}

impl Value {
    /// Wrap an instruction buffer as a callable value.
    pub fn bytecode(code: impl Into<Rc<[u8]>>) -> Self {
        Value::Bytecode(code.into())
    }

    /// Wrap a host callback as a callable value.
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&mut OperandStack) -> i32 + 'static,
    {
        Value::Native(Rc::new(f))
    }

    /// True only for the number variant.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// True for values `JSR` accepts: bytecode or native.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Bytecode(_) | Value::Native(_))
    }

    /// True only for the native variant.
    pub fn is_native(&self) -> bool {
        matches!(self, Value::Native(_))
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytecode(&self) -> Option<Rc<[u8]>> {
        match self {
            Value::Bytecode(code) => Some(code.clone()),
            _ => None,
        }
    }

    pub fn as_native(&self) -> Option<NativeFn> {
        match self {
            Value::Native(f) => Some(f.clone()),
            _ => None,
        }
    }

    /// Variant name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Bytecode(_) => "bytecode",
            Value::Native(_) => "native",
        }
    }
}

impl PartialEq for Value {
    /// Numbers compare per IEEE-754 (`NaN != NaN`), strings byte-wise,
    /// bytecode and native payloads by handle identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytecode(a), Value::Bytecode(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => f.debug_tuple("Number").field(v).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Bytecode(code) => write!(f, "Bytecode({} bytes)", code.len()),
            Value::Native(_) => f.write_str("Native(..)"),
        }
    }
}

//! VM shell and host entry points.

use std::rc::Rc;

use tracing::debug;

use crate::error::Fault;
use crate::executor::Executor;
use crate::flags::Flags;
use crate::globals::Globals;
use crate::value::Value;

/// An embeddable virtual machine instance.
///
/// Owns the operand stack, call stack and global name table; the table is
/// carried across [`execute`](Vm::execute) and [`call`](Vm::call)
/// invocations. Strictly single-threaded: one dispatch loop runs to
/// completion on the calling thread. A native invoked during execution must
/// not re-enter `execute`/`call` on the same instance.
pub struct Vm {
    globals: Globals,
    exec: Executor,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_globals(Globals::new())
    }

    /// Build an instance over an existing table, for embeddings that share
    /// one set of globals between several executors.
    pub fn with_globals(globals: Globals) -> Self {
        Self {
            exec: Executor::new(globals.clone()),
            globals,
        }
    }

    /// Insert or overwrite a global binding.
    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.set(name, value);
    }

    /// Look up a global binding.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.get(name)
    }

    /// Push a value onto the operand stack.
    pub fn push(&mut self, value: Value) {
        self.exec.stack_mut().push(value);
    }

    /// Borrow the operand-stack element `offset` below the top.
    pub fn peek(&self, offset: usize) -> Option<&Value> {
        self.exec.stack().peek(offset)
    }

    /// Remove and return the top of the operand stack.
    pub fn pop(&mut self) -> Option<Value> {
        self.exec.stack_mut().pop()
    }

    pub fn stack_depth(&self) -> usize {
        self.exec.stack().depth()
    }

    /// Condition register left by the last flag-setting instruction.
    pub fn flags(&self) -> Flags {
        self.exec.flags()
    }

    /// Diagnostic: why the last run halted, when it halted on a fault.
    pub fn last_fault(&self) -> Option<&Fault> {
        self.exec.last_fault()
    }

    /// Run `code` as a top-level program; returns the operand-stack depth
    /// when the loop halts.
    pub fn execute(&mut self, code: Rc<[u8]>) -> i32 {
        debug!(bytes = code.len(), "execute");
        self.exec.execute(code)
    }

    /// Invoke a callable global by name.
    ///
    /// Returns -1 when the name is unbound or the binding is not callable.
    /// A native reports its produced-result count; a scripted subroutine
    /// reports the stack depth at return, like [`execute`](Vm::execute).
    /// The call stack is not reset between host calls.
    pub fn call(&mut self, name: &str) -> i32 {
        let Some(target) = self.globals.get(name) else {
            debug!(name, "call target not bound");
            return -1;
        };
        match target {
            Value::Native(callee) => callee(self.exec.stack_mut()),
            Value::Bytecode(code) => self.exec.execute(code),
            other => {
                debug!(name, kind = other.kind(), "call target not callable");
                -1
            }
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

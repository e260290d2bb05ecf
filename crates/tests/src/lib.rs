//! Integration test harness for the armature VM.
//!
//! Provides a host fixture preloaded with the native callbacks the
//! end-to-end scenarios exercise, plus helpers for binding scripted
//! subroutines assembled with the bytecode builder.

use std::rc::Rc;

use armature_vm::{Builder, OpCode, Value, Vm};

/// Host-side fixture: a VM with a `sin` native bound, mirroring how the
/// rigging runtime exposes its math callbacks to scripts.
pub struct TestHost {
    pub vm: Vm,
}

impl TestHost {
    pub fn new() -> Self {
        let mut vm = Vm::new();
        vm.set_global(
            "sin",
            Value::native(|stack| {
                if let Some(Value::Number(v)) = stack.pop() {
                    stack.push(Value::Number(v.sin()));
                }
                1
            }),
        );
        Self { vm }
    }

    /// Bind a scripted subroutine under `name`.
    pub fn bind(&mut self, name: &str, code: Rc<[u8]>) {
        self.vm.set_global(name, Value::Bytecode(code));
    }

    /// Top of the operand stack, which must hold a number.
    pub fn top(&self) -> f32 {
        self.vm
            .peek(0)
            .and_then(Value::as_number)
            .expect("expected a number on top of the stack")
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

/// `[op, RET]`, the smallest useful subroutine shape.
pub fn binary_op(op: OpCode) -> Rc<[u8]> {
    Builder::new().op(op).op(OpCode::Ret).finish()
}

//! Instruction dispatch loop.
//!
//! [`Executor::step`] interprets one instruction and reports whether the
//! loop should continue; [`Executor::run`] drives `step` to completion.
//! Faults are expressed as an early halt, never as panics or host-visible
//! errors: the offending instruction leaves the stack as it was, records a
//! [`Fault`] and stops the loop. `RET` with an empty call stack is the
//! normal top-level termination path and records nothing.

use std::rc::Rc;

use tracing::trace;

use crate::error::Fault;
use crate::flags::Flags;
use crate::frame::{CallStack, Frame};
use crate::globals::Globals;
use crate::opcode::OpCode;
use crate::stack::OperandStack;
use crate::value::Value;

/// Deepest operand stack the dispatch loop will produce. Host pushes are not
/// capped; the limit only stops runaway scripts.
const STACK_LIMIT: usize = 1024;

/// Per-instance execution state: operand stack, call stack, the currently
/// executing buffer, program counter and flag register.
#[derive(Debug)]
pub struct Executor {
    stack: OperandStack,
    calls: CallStack,
    globals: Globals,
    code: Option<Rc<[u8]>>,
    pc: usize,
    flags: Flags,
    last_fault: Option<Fault>,
}

impl Executor {
    pub fn new(globals: Globals) -> Self {
        Self {
            stack: OperandStack::new(),
            calls: CallStack::new(),
            globals,
            code: None,
            pc: 0,
            flags: Flags::none(),
            last_fault: None,
        }
    }

    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut OperandStack {
        &mut self.stack
    }

    /// Condition register as left by the last flag-setting instruction.
    /// Persists across [`execute`](Self::execute) invocations.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Why the last run halted, when it halted on a fault.
    pub fn last_fault(&self) -> Option<&Fault> {
        self.last_fault.as_ref()
    }

    /// Return frames currently outstanding. Not reset between host calls.
    pub fn call_depth(&self) -> usize {
        self.calls.depth()
    }

    /// Run `code` as a top-level program: pc starts at 0, the loop runs to
    /// halt, the buffer is unloaded again. Returns the operand-stack depth
    /// at halt.
    pub fn execute(&mut self, code: Rc<[u8]>) -> i32 {
        self.last_fault = None;
        self.code = Some(code);
        self.pc = 0;
        let depth = self.run();
        self.code = None;
        self.pc = 0;
        depth
    }

    /// Step until an instruction ends the loop; report the stack depth.
    pub fn run(&mut self) -> i32 {
        while self.step() {}
        self.stack.depth() as i32
    }

    /// Interpret one instruction. Returns true when the loop should
    /// continue. Running off the end of the buffer halts cleanly.
    pub fn step(&mut self) -> bool {
        let Some(code) = self.code.clone() else {
            return false;
        };
        let Some(&byte) = code.get(self.pc) else {
            return false;
        };
        self.pc += 1;
        let Some(op) = OpCode::from_u8(byte) else {
            return self.fault(Fault::UnknownOpcode {
                byte,
                offset: self.pc - 1,
            });
        };

        match op {
            OpCode::Nop => true,

            OpCode::Add => self.op_binary(op, |l, r| l + r),
            OpCode::Sub => self.op_binary(op, |l, r| l - r),
            OpCode::Mul => self.op_binary(op, |l, r| l * r),
            OpCode::Div => self.op_binary(op, |l, r| l / r),
            OpCode::Mod => self.op_binary(op, |l, r| l % r),
            OpCode::Neg => self.op_neg(),

            OpCode::PushNumber => self.op_push_number(&code),
            OpCode::PushString => self.op_push_string(&code),
            OpCode::Pop => self.op_pop(&code),
            OpCode::Peek => self.op_peek(&code),

            OpCode::Cmp => self.op_cmp(),

            OpCode::Jmp => self.op_jump(&code, true),
            OpCode::Jeq => self.op_jump(&code, self.flags.eq()),
            OpCode::Jnq => self.op_jump(&code, !self.flags.eq()),
            OpCode::Jl => self.op_jump(&code, self.flags.below()),
            OpCode::Jle => self.op_jump(&code, self.flags.below() || self.flags.eq()),
            OpCode::Jg => self.op_jump(&code, self.flags.above()),
            OpCode::Jge => self.op_jump(&code, self.flags.above() || self.flags.eq()),

            OpCode::Jsr => self.op_jsr(&code),
            OpCode::Ret => self.op_ret(),

            OpCode::SetGlobal => self.op_set_global(),
            OpCode::GetGlobal => self.op_get_global(),
        }
    }

    fn fault(&mut self, fault: Fault) -> bool {
        trace!(%fault, pc = self.pc, "dispatch halted");
        self.last_fault = Some(fault);
        false
    }

    fn push_checked(&mut self, op: OpCode, value: Value) -> bool {
        if self.stack.depth() >= STACK_LIMIT {
            return self.fault(Fault::StackOverflow { opcode: op });
        }
        self.stack.push(value);
        true
    }

    fn read_bytes<const N: usize>(&mut self, code: &[u8]) -> Option<[u8; N]> {
        let end = self.pc.checked_add(N)?;
        let bytes: [u8; N] = code.get(self.pc..end)?.try_into().ok()?;
        self.pc = end;
        Some(bytes)
    }

    fn read_u8(&mut self, code: &[u8]) -> Option<u8> {
        self.read_bytes::<1>(code).map(|[byte]| byte)
    }

    fn read_u32(&mut self, code: &[u8]) -> Option<u32> {
        self.read_bytes(code).map(u32::from_le_bytes)
    }

    fn read_f32(&mut self, code: &[u8]) -> Option<f32> {
        self.read_bytes(code).map(f32::from_le_bytes)
    }

    /// Shared shape of ADD/SUB/MUL/DIV/MOD: lhs one below the top, rhs on
    /// top, both numeric or the instruction faults without touching the
    /// stack.
    fn op_binary(&mut self, op: OpCode, apply: impl Fn(f32, f32) -> f32) -> bool {
        let (lhs, rhs) = match (self.stack.peek(1), self.stack.peek(0)) {
            (Some(Value::Number(lhs)), Some(Value::Number(rhs))) => (*lhs, *rhs),
            (Some(_), Some(_)) => return self.fault(Fault::TypeFault { opcode: op }),
            _ => return self.fault(Fault::StackUnderflow { opcode: op }),
        };
        self.stack.remove(0, 2);
        self.push_checked(op, Value::Number(apply(lhs, rhs)))
    }

    fn op_neg(&mut self) -> bool {
        let value = match self.stack.peek(0) {
            Some(Value::Number(value)) => *value,
            Some(_) => return self.fault(Fault::TypeFault { opcode: OpCode::Neg }),
            None => return self.fault(Fault::StackUnderflow { opcode: OpCode::Neg }),
        };
        self.stack.pop();
        self.push_checked(OpCode::Neg, Value::Number(-value))
    }

    fn op_push_number(&mut self, code: &[u8]) -> bool {
        let Some(value) = self.read_f32(code) else {
            return self.fault(Fault::TruncatedOperand { offset: self.pc });
        };
        self.push_checked(OpCode::PushNumber, Value::Number(value))
    }

    fn op_push_string(&mut self, code: &[u8]) -> bool {
        let Some(length) = self.read_u32(code) else {
            return self.fault(Fault::TruncatedOperand { offset: self.pc });
        };
        let body = self
            .pc
            .checked_add(length as usize)
            .and_then(|end| code.get(self.pc..end));
        let Some(bytes) = body else {
            return self.fault(Fault::TruncatedOperand { offset: self.pc });
        };
        // UTF-8 by convention; invalid sequences are replaced on intern.
        let text = String::from_utf8_lossy(bytes).into_owned();
        self.pc += length as usize;
        self.push_checked(OpCode::PushString, Value::Str(text))
    }

    fn op_pop(&mut self, code: &[u8]) -> bool {
        let (Some(offset), Some(count)) = (self.read_u8(code), self.read_u8(code)) else {
            return self.fault(Fault::TruncatedOperand { offset: self.pc });
        };
        if !self.stack.remove(offset as usize, count as usize) {
            return self.fault(Fault::StackUnderflow {
                opcode: OpCode::Pop,
            });
        }
        true
    }

    fn op_peek(&mut self, code: &[u8]) -> bool {
        let Some(offset) = self.read_u8(code) else {
            return self.fault(Fault::TruncatedOperand { offset: self.pc });
        };
        let Some(value) = self.stack.peek(offset as usize).cloned() else {
            return self.fault(Fault::StackUnderflow {
                opcode: OpCode::Peek,
            });
        };
        self.push_checked(OpCode::Peek, value)
    }

    /// Set the flag register from the top two elements without popping them.
    ///
    /// CMP always ends its micro-sequence: the register survives for the
    /// next run, the loop does not continue past it.
    fn op_cmp(&mut self) -> bool {
        self.flags = Flags::invalid_op();
        match (self.stack.peek(1), self.stack.peek(0)) {
            (Some(Value::Number(lhs)), Some(Value::Number(rhs))) => {
                self.flags = Flags::from_compare(*lhs, *rhs);
            }
            (Some(_), Some(_)) => return self.fault(Fault::TypeFault { opcode: OpCode::Cmp }),
            _ => {
                return self.fault(Fault::StackUnderflow {
                    opcode: OpCode::Cmp,
                })
            }
        }
        false
    }

    fn op_jump(&mut self, code: &[u8], taken: bool) -> bool {
        let Some(target) = self.read_u32(code) else {
            return self.fault(Fault::TruncatedOperand { offset: self.pc });
        };
        // Backedges only: a target at or past the pc falls through.
        if taken && (target as usize) < self.pc {
            self.pc = target as usize;
        }
        true
    }

    fn op_jsr(&mut self, code: &Rc<[u8]>) -> bool {
        let Some(target) = self.stack.pop() else {
            return self.fault(Fault::StackUnderflow {
                opcode: OpCode::Jsr,
            });
        };
        match target {
            Value::Native(callee) => {
                // The produced-count convention is surfaced through the host
                // `call` entry point, not inside the loop.
                callee(&mut self.stack);
                true
            }
            Value::Bytecode(callee) => {
                self.calls.push(Frame {
                    code: code.clone(),
                    pc: self.pc,
                });
                self.code = Some(callee);
                self.pc = 0;
                true
            }
            other => self.fault(Fault::NotCallable { kind: other.kind() }),
        }
    }

    fn op_ret(&mut self) -> bool {
        match self.calls.pop() {
            Some(frame) => {
                self.code = Some(frame.code);
                self.pc = frame.pc;
                true
            }
            // Top-level return: hand control back to the host.
            None => false,
        }
    }

    fn op_set_global(&mut self) -> bool {
        if self.stack.depth() < 2 {
            return self.fault(Fault::StackUnderflow {
                opcode: OpCode::SetGlobal,
            });
        }
        if !matches!(self.stack.peek(0), Some(Value::Str(_))) {
            return self.fault(Fault::TypeFault {
                opcode: OpCode::SetGlobal,
            });
        }
        let (name, value) = match (self.stack.pop(), self.stack.pop()) {
            (Some(Value::Str(name)), Some(value)) => (name, value),
            _ => {
                return self.fault(Fault::StackUnderflow {
                    opcode: OpCode::SetGlobal,
                })
            }
        };
        self.globals.set(name, value);
        true
    }

    fn op_get_global(&mut self) -> bool {
        let name = match self.stack.pop() {
            Some(Value::Str(name)) => name,
            Some(_) => {
                return self.fault(Fault::TypeFault {
                    opcode: OpCode::GetGlobal,
                })
            }
            None => {
                return self.fault(Fault::StackUnderflow {
                    opcode: OpCode::GetGlobal,
                })
            }
        };
        match self.globals.get(&name) {
            Some(value) => self.push_checked(OpCode::GetGlobal, value),
            None => self.fault(Fault::MissingGlobal { name }),
        }
    }
}

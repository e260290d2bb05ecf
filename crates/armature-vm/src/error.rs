//! Fault taxonomy.
//!
//! Faults never cross the host boundary as errors: the dispatch loop halts
//! and the host observes the outcome through stack depth, the flag register,
//! or a `call` return of -1. The executor records the most recent fault so
//! embedding layers can attach a diagnostic when they want one.

use thiserror::Error;

use crate::opcode::OpCode;

/// Reason the dispatch loop halted early.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    /// An instruction reached past the current operand-stack depth.
    #[error("operand stack underflow in {opcode}")]
    StackUnderflow { opcode: OpCode },

    /// The dispatch loop refused to grow the operand stack any further.
    #[error("operand stack limit exceeded in {opcode}")]
    StackOverflow { opcode: OpCode },

    /// Operand types are incompatible with the instruction.
    #[error("type fault in {opcode}")]
    TypeFault { opcode: OpCode },

    /// An inline operand extends past the end of the bytecode buffer.
    #[error("bytecode truncated at offset {offset}")]
    TruncatedOperand { offset: usize },

    /// The fetched byte is not a known opcode.
    #[error("unknown opcode 0x{byte:02X} at offset {offset}")]
    UnknownOpcode { byte: u8, offset: usize },

    /// `GETG` named a global that is not bound.
    #[error("global not found: {name}")]
    MissingGlobal { name: String },

    /// `JSR` popped a value that is neither bytecode nor native.
    #[error("value is not callable: {kind}")]
    NotCallable { kind: &'static str },
}

//! End-to-end host scenarios.
//!
//! Each test drives the VM the way the rigging runtime does: bind globals,
//! push arguments, invoke a named callable, read results back off the
//! operand stack.

use armature_tests::{binary_op, TestHost};
use armature_vm::{Builder, OpCode, Value};

#[test]
fn native_call_through_the_host() {
    let mut host = TestHost::new();
    host.vm.push(Value::Number(1.0));
    assert_eq!(host.vm.call("sin"), 1);
    assert_eq!(host.vm.stack_depth(), 1);
    assert_eq!(host.top(), 1.0f32.sin());
}

#[test]
fn scripted_add() {
    let mut host = TestHost::new();
    host.bind("add", binary_op(OpCode::Add));
    host.vm.push(Value::Number(32.0));
    host.vm.push(Value::Number(32.0));
    assert_eq!(host.vm.call("add"), 1);
    assert_eq!(host.top(), 64.0);
}

#[test]
fn scripted_sub() {
    let mut host = TestHost::new();
    host.bind("sub", binary_op(OpCode::Sub));
    host.vm.push(Value::Number(32.0));
    host.vm.push(Value::Number(32.0));
    assert_eq!(host.vm.call("sub"), 1);
    assert_eq!(host.top(), 0.0);
}

#[test]
fn scripted_div() {
    let mut host = TestHost::new();
    host.bind("div", binary_op(OpCode::Div));
    host.vm.push(Value::Number(32.0));
    host.vm.push(Value::Number(2.0));
    assert_eq!(host.vm.call("div"), 1);
    assert_eq!(host.top(), 16.0);
}

#[test]
fn scripted_mul() {
    let mut host = TestHost::new();
    host.bind("mul", binary_op(OpCode::Mul));
    host.vm.push(Value::Number(32.0));
    host.vm.push(Value::Number(2.0));
    assert_eq!(host.vm.call("mul"), 1);
    assert_eq!(host.top(), 64.0);
}

#[test]
fn scripted_mod() {
    let mut host = TestHost::new();
    host.bind("mod", binary_op(OpCode::Mod));
    host.vm.push(Value::Number(32.0));
    host.vm.push(Value::Number(16.0));
    assert_eq!(host.vm.call("mod"), 1);
    assert_eq!(host.top(), 0.0);
}

#[test]
fn scripted_subroutine_reaches_a_native() {
    // The script looks the native up in globals and dispatches through JSR,
    // the same path a compiled rig expression would take.
    let mut host = TestHost::new();
    let code = Builder::new()
        .push_number(1.0)
        .push_string("sin")
        .op(OpCode::GetGlobal)
        .op(OpCode::Jsr)
        .op(OpCode::Ret)
        .finish();
    host.bind("bcfunc", code);
    assert_eq!(host.vm.call("bcfunc"), 1);
    assert_eq!(host.vm.stack_depth(), 1);
    assert_eq!(host.top(), 1.0f32.sin());
}

#[test]
fn results_accumulate_across_calls() {
    let mut host = TestHost::new();
    host.bind("add", binary_op(OpCode::Add));
    host.vm.push(Value::Number(1.0));
    host.vm.push(Value::Number(2.0));
    host.vm.call("add");
    host.vm.push(Value::Number(10.0));
    host.vm.call("add");
    assert_eq!(host.vm.stack_depth(), 1);
    assert_eq!(host.top(), 13.0);
}

#[test]
fn one_script_binds_a_global_another_reads_it() {
    let mut host = TestHost::new();
    let store = Builder::new()
        .push_number(42.5)
        .push_string("rest_angle")
        .op(OpCode::SetGlobal)
        .op(OpCode::Ret)
        .finish();
    let load = Builder::new()
        .push_string("rest_angle")
        .op(OpCode::GetGlobal)
        .op(OpCode::Ret)
        .finish();
    host.bind("store", store);
    host.bind("load", load);
    assert_eq!(host.vm.call("store"), 0);
    assert_eq!(host.vm.call("load"), 1);
    assert_eq!(host.top(), 42.5);
}

#[test]
fn host_observes_invalid_op_after_mixed_compare() {
    let mut host = TestHost::new();
    let code = Builder::new()
        .push_number(1.0)
        .push_string("shoulder")
        .op(OpCode::Cmp)
        .finish();
    host.vm.execute(code);
    assert!(host.vm.flags().invalid());
}

#[test]
fn pop_and_peek_shape_results_for_the_host() {
    // A script that computes two candidates, keeps a copy of the first and
    // drops the scratch value between them.
    let mut host = TestHost::new();
    let code = Builder::new()
        .push_number(3.0)
        .push_number(99.0)
        .pop(0, 1)
        .peek(0)
        .op(OpCode::Ret)
        .finish();
    assert_eq!(host.vm.execute(code), 2);
    assert_eq!(host.top(), 3.0);
}

use string_interner::DefaultStringInterner;

use frontend::Parser;
use x86_backend::{CodeGenerator, OptLevel, TargetArch};

fn generate(source: &str) -> String {
    generate_with(source, false)
}

fn generate_with(source: &str, debug_info: bool) -> String {
    let mut interner = DefaultStringInterner::new();
    let program;
    {
        let mut parser = Parser::new(source, &mut interner);
        program = parser.parse_program().expect("parse");
        assert!(parser.errors.is_empty(), "parse errors: {:?}", parser.errors);
    }
    let mut generator = CodeGenerator::new(&program, &interner, TargetArch::X86_64, OptLevel::None, debug_info);
    generator.generate().expect("codegen")
}

/// Assert that `needles` appear in `haystack` in the given order.
fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut from = 0;
    for needle in needles {
        match haystack[from..].find(needle) {
            Some(pos) => from += pos + needle.len(),
            None => panic!("expected '{}' after byte {} in:\n{}", needle, from, haystack),
        }
    }
}

#[test]
fn empty_main_has_entry_point() {
    let asm = generate("i32 main() { return 0; }");
    assert!(asm.contains("main:"));
    assert!(asm.contains("_start:"));
    assert!(asm.contains("call main"));
    assert!(asm.contains("mov %rax, %rdi"));
    assert!(asm.contains("mov $60, %rax"));
    assert!(asm.contains("syscall"));
}

#[test]
fn exactly_one_start_label() {
    let asm = generate("i32 one() { return 1; } i32 main() { return one(); }");
    assert_eq!(asm.matches("_start:").count(), 1);
}

#[test]
fn addition_uses_stack_machine_order() {
    let asm = generate("i32 main() { return 2 + 3; }");
    assert_in_order(
        &asm,
        &[
            "mov $2, %rax",
            "push %rax",
            "mov $3, %rax",
            "mov %rax, %rbx",
            "pop %rax",
            "add %rbx, %rax",
        ],
    );
}

#[test]
fn if_else_labels_and_epilogues() {
    let asm = generate("i32 main() { if (1) { return 7; } else { return 9; } }");
    assert!(asm.contains("else_0"));
    assert!(asm.contains("endif_0"));
    assert!(asm.contains("test %rax, %rax"));
    assert!(asm.contains("je else_0"));
    // one epilogue per return plus the fallthrough one
    assert!(asm.matches("pop %rbp").count() >= 2);
}

#[test]
fn while_loop_labels() {
    let asm = generate("i32 main() { i32 x = 0; while (x) { x = x; } return 0; }");
    assert!(asm.contains("loop_0:"));
    assert!(asm.contains("endloop_0:"));
    assert!(asm.contains("jmp loop_0"));
    assert!(asm.contains("je endloop_0"));
}

#[test]
fn printf_string_literal_uses_write_syscall() {
    let asm = generate("i32 main() { printf(\"hi\"); return 0; }");
    assert!(asm.contains("str0: .ascii \"hi\""));
    assert_in_order(
        &asm,
        &["mov $str0, %rax", "mov %rax, %rsi", "mov $2, %rdx", "mov $1, %rdi", "mov $1, %rax", "syscall"],
    );
}

#[test]
fn printf_int_format_stringifies_literal() {
    let asm = generate("i32 main() { printf(\"%d\", 42); return 0; }");
    // the stringified value lands in the literal table
    assert!(asm.contains(".ascii \"42\""));
    assert!(asm.contains("mov $2, %rdx"));
    assert!(asm.contains("mov $1, %rdi"));
}

#[test]
fn string_literals_are_deduplicated() {
    let asm = generate("i32 main() { printf(\"hi\"); printf(\"hi\"); return 0; }");
    assert_eq!(asm.matches(".ascii \"hi\"").count(), 1);
}

#[test]
fn function_prologue_reserves_fixed_frame() {
    let asm = generate("i32 main() { return 0; }");
    assert_in_order(&asm, &["main:", "push %rbp", "mov %rsp, %rbp", "sub $64, %rsp"]);
}

#[test]
fn locals_get_descending_offsets_sized_by_type() {
    let asm = generate("i32 main() { i32 a = 1; i64 b = 2; return 0; }");
    // i32 takes 4 bytes, i64 the next 8
    assert!(asm.contains("mov %rax, -4(%rbp)"));
    assert!(asm.contains("mov %rax, -12(%rbp)"));
}

#[test]
fn parameters_start_at_positive_sixteen() {
    let asm = generate("i32 add(i32 a, i32 b) { return a + b; }");
    assert!(asm.contains("mov 16(%rbp), %rax"));
    assert!(asm.contains("mov 24(%rbp), %rax"));
}

#[test]
fn scope_exit_pops_inner_variables() {
    let asm = generate("i32 main() { i32 x = 1; { i32 x = 2; } x = 3; return 0; }");
    // outer x at -4, inner shadow at -8; the assignment after the block
    // goes back to the outer slot
    assert_in_order(
        &asm,
        &["mov %rax, -4(%rbp)", "mov %rax, -8(%rbp)", "mov $3, %rax", "mov %rax, -4(%rbp)"],
    );
}

#[test]
fn for_loop_layout() {
    let asm = generate("i32 main() { for (i32 i = 0; i < 3; i = i + 1) { } return 0; }");
    assert!(asm.contains("for_loop_0:"));
    assert!(asm.contains("for_condition_0:"));
    assert!(asm.contains("for_end_0:"));
    assert!(asm.contains("jmp for_condition_0"));
    assert!(asm.contains("jne for_loop_0"));
}

#[test]
fn for_without_condition_loops_unconditionally() {
    let asm = generate("i32 main() { for (;;) { break; } return 0; }");
    assert!(asm.contains("jmp for_loop_0"));
    // break escapes to the loop end
    assert!(asm.contains("jmp for_end_0"));
}

#[test]
fn continue_in_for_targets_the_step() {
    let asm = generate("i32 main() { for (i32 i = 0; i < 3; i = i + 1) { continue; } return 0; }");
    assert!(asm.contains("for_step_0:"));
    assert!(asm.contains("jmp for_step_0"));
}

#[test]
fn while_break_and_continue() {
    let asm = generate("i32 main() { while (1) { if (0) { break; } continue; } return 0; }");
    assert!(asm.contains("jmp endloop_0"));
    assert!(asm.matches("jmp loop_0").count() >= 2);
}

#[test]
fn do_while_runs_body_before_condition() {
    let asm = generate("i32 main() { i32 x = 0; do { x = x + 1; } while (x < 3); return 0; }");
    // body label comes first, condition test jumps back to it
    assert_in_order(&asm, &["loop_0:", "loop_1:", "test %rax, %rax", "jne loop_0"]);
}

#[test]
fn switch_comparisons_reach_their_case_bodies() {
    let source = "i32 main() { i32 y = 0; switch (2) { case 1: y = 1; break; case 2: y = 2; break; default: y = 9; } return y; }";
    let asm = generate(source);

    // every comparison jump has a matching emitted label
    assert!(asm.contains("je case_0"));
    assert!(asm.contains("case_0:"));
    assert!(asm.contains("je case_1"));
    assert!(asm.contains("case_1:"));
    assert!(asm.contains("switch_default_0:"));
    assert!(asm.contains("jmp switch_default_0"));
    assert!(asm.contains("switch_end_0:"));
    // the scrutinee slot is cleaned up
    assert_in_order(&asm, &["switch_end_0:", "add $8, %rsp"]);
    // break inside a case escapes the switch
    assert!(asm.contains("jmp switch_end_0"));
}

#[test]
fn switch_without_default_jumps_to_end() {
    let asm = generate("i32 main() { switch (1) { case 1: return 1; } return 0; }");
    assert!(asm.contains("jmp switch_end_0"));
    assert!(!asm.contains("switch_default_0:"));
}

#[test]
fn ternary_labels() {
    let asm = generate("i32 main() { return 1 ? 2 : 3; }");
    assert!(asm.contains("ternary_false_0"));
    assert!(asm.contains("ternary_end_0"));
    assert_in_order(&asm, &["test %rax, %rax", "je ternary_false_0"]);
}

#[test]
fn comparison_sets_flags_into_rax() {
    let asm = generate("i32 main() { return 1 < 2; }");
    assert_in_order(&asm, &["cmp %rbx, %rax", "setl %al", "movzb %al, %rax"]);
}

#[test]
fn division_sign_extends() {
    let asm = generate("i32 main() { return 7 / 2; }");
    assert_in_order(&asm, &["cqo", "idiv %rbx"]);
}

#[test]
fn modulo_takes_remainder_from_rdx() {
    let asm = generate("i32 main() { return 7 % 2; }");
    assert_in_order(&asm, &["cqo", "idiv %rbx", "mov %rdx, %rax"]);
}

#[test]
fn bitwise_and_shift_operators() {
    let asm = generate("i32 main() { return (1 & 3) | (4 ^ 5) | (1 << 2) | (8 >> 1); }");
    assert!(asm.contains("and %rbx, %rax"));
    assert!(asm.contains("or %rbx, %rax"));
    assert!(asm.contains("xor %rbx, %rax"));
    assert!(asm.contains("sal %cl, %rax"));
    assert!(asm.contains("sar %cl, %rax"));
}

#[test]
fn unary_operators() {
    let asm = generate("i32 main() { i32 x = 1; return -x + ~x + !x; }");
    assert!(asm.contains("neg %rax"));
    assert!(asm.contains("not %rax"));
    assert_in_order(&asm, &["sete %al", "movzb %al, %rax"]);
}

#[test]
fn address_of_and_dereference() {
    let asm = generate("i32 main() { i32 x = 1; i32* p = &x; return *p; }");
    assert_in_order(&asm, &["lea $-4, %rax", "add %rbp, %rax"]);
    assert!(asm.contains("mov (%rax), %rax"));
}

#[test]
fn increment_writes_back() {
    let asm = generate("i32 main() { i32 x = 1; x++; ++x; return x; }");
    assert!(asm.contains("add $1, %rbx"));
    assert!(asm.contains("add $1, %rax"));
}

#[test]
fn compound_assignment_combines_and_stores() {
    let asm = generate("i32 main() { i32 x = 1; x += 2; return x; }");
    assert_in_order(&asm, &["push %rax", "pop %rbx", "add %rbx, %rax", "mov %rax, -4(%rbp)"]);
}

#[test]
fn call_pushes_arguments_right_to_left() {
    let asm = generate("i32 add(i32 a, i32 b) { return a + b; } i32 main() { return add(1, 2); }");
    assert_in_order(
        &asm,
        &["mov $2, %rax", "push %rax", "mov $1, %rax", "push %rax", "call add", "add $16, %rsp"],
    );
}

#[test]
fn array_access_uses_eight_byte_stride() {
    let asm = generate("i32 main() { i64* a; return a[2]; }");
    assert_in_order(
        &asm,
        &["push %rax", "mov $2, %rax", "imul $8, %rax", "pop %rbx", "add %rbx, %rax", "mov (%rax), %rax"],
    );
}

#[test]
fn arrow_member_access_dereferences_first() {
    let asm = generate("i32 main() { i32* p; return p->x; }");
    assert_in_order(&asm, &["mov (%rax), %rax", "add $0, %rax"]);
}

#[test]
fn return_without_value_zeroes_rax() {
    let asm = generate("void f() { return; } i32 main() { return 0; }");
    assert_in_order(&asm, &["f:", "mov $0, %rax"]);
}

#[test]
fn exported_function_still_emits_code() {
    let asm = generate("export i32 one() { return 1; } i32 main() { return one(); }");
    assert!(asm.contains("one:"));
}

#[test]
fn float_literal_degrades_to_integer() {
    let asm = generate("i32 main() { return 3.75; }");
    assert!(asm.contains("mov $3, %rax"));
}

#[test]
fn debug_info_emits_node_comments() {
    let asm = generate_with("i32 main() { return 0; }", true);
    assert!(asm.contains("# Node: ReturnStatement"));
}

#[test]
fn non_x86_target_is_rejected() {
    let mut interner = DefaultStringInterner::new();
    let program;
    {
        let mut parser = Parser::new("i32 main() { return 0; }", &mut interner);
        program = parser.parse_program().expect("parse");
    }
    let mut generator = CodeGenerator::new(&program, &interner, TargetArch::Arm64, OptLevel::None, false);
    assert!(generator.generate().is_err());
}

#[test]
fn printf_with_unsupported_format_is_recorded() {
    let mut interner = DefaultStringInterner::new();
    let program;
    {
        let mut parser = Parser::new("i32 main() { printf(\"%s\", 1); return 0; }", &mut interner);
        program = parser.parse_program().expect("parse");
    }
    let mut generator = CodeGenerator::new(&program, &interner, TargetArch::X86_64, OptLevel::None, false);
    assert!(generator.generate().is_err());
    assert_eq!(generator.error_count(), 1);
    assert!(generator.errors()[0].contains("%d"));
}

#[test]
fn printf_int_format_with_non_literal_argument_is_recorded() {
    let mut interner = DefaultStringInterner::new();
    let program;
    {
        let source = "i32 main() { i32 x = 1; printf(\"%d\", x); return 0; }";
        let mut parser = Parser::new(source, &mut interner);
        program = parser.parse_program().expect("parse");
    }
    let mut generator = CodeGenerator::new(&program, &interner, TargetArch::X86_64, OptLevel::None, false);
    assert!(generator.generate().is_err());
    assert_eq!(generator.error_count(), 1);
}

#[test]
fn break_outside_loop_is_recorded() {
    let mut interner = DefaultStringInterner::new();
    let program;
    {
        let mut parser = Parser::new("i32 main() { break; return 0; }", &mut interner);
        program = parser.parse_program().expect("parse");
    }
    let mut generator = CodeGenerator::new(&program, &interner, TargetArch::X86_64, OptLevel::None, false);
    assert!(generator.generate().is_err());
    assert_eq!(generator.error_count(), 1);
}

#[test]
fn function_records_track_main() {
    let mut interner = DefaultStringInterner::new();
    let program;
    {
        let mut parser = Parser::new("i32 helper() { return 1; } i32 main() { return 0; }", &mut interner);
        program = parser.parse_program().expect("parse");
    }
    let mut generator = CodeGenerator::new(&program, &interner, TargetArch::X86_64, OptLevel::None, false);
    generator.generate().expect("codegen");

    let functions = generator.functions();
    assert_eq!(functions.len(), 2);
    assert!(!functions[0].is_main);
    assert!(functions[1].is_main);
    assert_eq!(functions[0].param_count, 0);
}

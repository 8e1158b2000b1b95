use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rlox::diagnostics::Diagnostics;
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::Scanner;

/// `Write` sink with a shared handle, so tests can read back what the
/// interpreter printed.
struct Sink(Rc<RefCell<Vec<u8>>>);

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs one source string through scan → parse → resolve → interpret against
/// an existing interpreter, the same sequencing the driver uses.
fn run_with(
    interpreter: &mut Interpreter,
    diagnostics: &mut Diagnostics,
    next_id: &mut u32,
    source: &str,
) {
    let tokens: Vec<_> = Scanner::new(source.as_bytes())
        .filter_map(Result::ok)
        .collect();

    let mut parser = Parser::with_id_base(&tokens, *next_id);
    let statements = parser.parse(diagnostics);
    *next_id = parser.id_watermark();

    if diagnostics.had_error() {
        return;
    }

    let mut resolver = Resolver::new(interpreter, diagnostics);
    resolver.resolve_all(&statements);

    if diagnostics.had_error() {
        return;
    }

    interpreter.interpret(&statements, diagnostics);
}

/// Runs a program in a fresh interpreter and reports
/// (printed output, had static error, had runtime error).
fn run(source: &str) -> (String, bool, bool) {
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::with_writer(Box::new(Sink(Rc::clone(&buffer))));
    let mut diagnostics = Diagnostics::new();
    let mut next_id: u32 = 0;

    run_with(&mut interpreter, &mut diagnostics, &mut next_id, source);

    let output = String::from_utf8(buffer.borrow().clone()).expect("output is utf-8");
    (
        output,
        diagnostics.had_error(),
        diagnostics.had_runtime_error(),
    )
}

/// Like [`run`] but asserts the program completed cleanly.
fn output_of(source: &str) -> String {
    let (output, had_error, had_runtime_error) = run(source);
    assert!(!had_error, "unexpected static error for: {}", source);
    assert!(
        !had_runtime_error,
        "unexpected runtime error for: {}",
        source
    );
    output
}

// ─────────────────────────────────────────────────────────────────────────
// Expressions and printing
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn evaluates_arithmetic() {
    assert_eq!(output_of("print 1 + 2;"), "3\n");
    assert_eq!(output_of("print (1 + 2) * 3 - 4 / 2;"), "7\n");
    assert_eq!(output_of("print -5 + 3;"), "-2\n");
}

#[test]
fn integral_numbers_print_without_fraction() {
    assert_eq!(output_of("print 3.0;"), "3\n");
    assert_eq!(output_of("print 2.5;"), "2.5\n");
    assert_eq!(output_of("print 10 / 4;"), "2.5\n");
}

#[test]
fn plus_stringifies_mixed_operands() {
    assert_eq!(output_of("print \"a\" + \"b\";"), "ab\n");
    assert_eq!(output_of("print \"a\" + 1;"), "a1\n");
    assert_eq!(output_of("print 1 + \"a\";"), "1a\n");
    assert_eq!(output_of("print \"v\" + true;"), "vtrue\n");
}

#[test]
fn equality_follows_value_semantics() {
    assert_eq!(output_of("print 1 == 1;"), "true\n");
    assert_eq!(output_of("print 1 == 2;"), "false\n");
    assert_eq!(output_of("print \"a\" == \"a\";"), "true\n");
    assert_eq!(output_of("print nil == nil;"), "true\n");
    // Cross-kind comparisons are never equal.
    assert_eq!(output_of("print 1 == \"1\";"), "false\n");
    assert_eq!(output_of("print nil == false;"), "false\n");
    assert_eq!(output_of("print 1 != 2;"), "true\n");
}

#[test]
fn truthiness_only_nil_and_false_are_falsy() {
    assert_eq!(output_of("if (nil) print \"t\"; else print \"f\";"), "f\n");
    assert_eq!(output_of("if (false) print \"t\"; else print \"f\";"), "f\n");
    assert_eq!(output_of("if (0) print \"t\"; else print \"f\";"), "t\n");
    assert_eq!(output_of("if (\"\") print \"t\"; else print \"f\";"), "t\n");
    assert_eq!(output_of("if (clock) print \"t\"; else print \"f\";"), "t\n");
    assert_eq!(output_of("print !nil;"), "true\n");
    assert_eq!(output_of("print !0;"), "false\n");
}

#[test]
fn logical_operators_short_circuit() {
    let source = "\
fun boom() { print \"boom\"; return true; }
print false and boom();
print true or boom();
print true and boom();
";
    assert_eq!(output_of(source), "false\ntrue\nboom\ntrue\n");
}

#[test]
fn logical_operators_return_the_deciding_operand() {
    assert_eq!(output_of("print \"hi\" or 2;"), "hi\n");
    assert_eq!(output_of("print nil or \"yes\";"), "yes\n");
    assert_eq!(output_of("print nil and \"no\";"), "nil\n");
}

#[test]
fn assignment_is_an_expression() {
    assert_eq!(output_of("var a = 1; print a = 2; print a;"), "2\n2\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Variables, scopes, closures
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn blocks_shadow_and_restore() {
    let source = "\
var a = 1;
{
  var a = 2;
  print a;
}
print a;
";
    assert_eq!(output_of(source), "2\n1\n");
}

#[test]
fn inner_blocks_may_assign_outer_variables() {
    let source = "\
var a = 1;
{
  a = 2;
}
print a;
";
    assert_eq!(output_of(source), "2\n");
}

#[test]
fn uninitialized_variable_is_nil() {
    assert_eq!(output_of("var a; print a;"), "nil\n");
}

#[test]
fn closures_capture_their_defining_environment() {
    let source = "\
fun makeCounter() {
  var count = 0;
  fun increment() {
    count = count + 1;
    return count;
  }
  return increment;
}
var counter = makeCounter();
print counter();
print counter();
";
    assert_eq!(output_of(source), "1\n2\n");
}

#[test]
fn closures_capture_per_iteration_locals() {
    let source = "\
var f1;
var f2;
var i = 1;
while (i <= 2) {
  var j = i;
  fun capture() { print j; }
  if (i == 1) f1 = capture; else f2 = capture;
  i = i + 1;
}
f1();
f2();
";
    assert_eq!(output_of(source), "1\n2\n");
}

#[test]
fn resolved_binding_ignores_later_globals_shadowing() {
    // The classic resolver test: `show` must keep seeing the binding that was
    // lexically visible at its declaration site.
    let source = "\
var a = \"global\";
{
  fun show() { print a; }
  show();
  var a = \"block\";
  show();
}
";
    assert_eq!(output_of(source), "global\nglobal\n");
}

#[test]
fn recursion_reaches_the_function_through_its_own_name() {
    let source = "\
fun fib(n) {
  if (n <= 1) return n;
  return fib(n - 1) + fib(n - 2);
}
print fib(10);
";
    assert_eq!(output_of(source), "55\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Control flow
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn while_loop_runs_until_condition_fails() {
    let source = "\
var i = 0;
while (i < 3) {
  print i;
  i = i + 1;
}
";
    assert_eq!(output_of(source), "0\n1\n2\n");
}

#[test]
fn for_loop_desugars_and_runs() {
    assert_eq!(
        output_of("for (var i = 0; i < 3; i = i + 1) print i;"),
        "0\n1\n2\n"
    );
}

#[test]
fn break_exits_only_the_innermost_loop() {
    let source = "\
var i = 0;
while (i < 3) {
  var j = 0;
  while (true) {
    if (j >= 1) break;
    print i * 10 + j;
    j = j + 1;
  }
  i = i + 1;
}
";
    assert_eq!(output_of(source), "0\n10\n20\n");
}

#[test]
fn break_skips_the_rest_of_the_loop_body() {
    let source = "\
var i = 0;
while (i < 10) {
  if (i == 2) break;
  print i;
  i = i + 1;
}
print \"done\";
";
    assert_eq!(output_of(source), "0\n1\ndone\n");
}

#[test]
fn return_unwinds_through_nested_loops() {
    let source = "\
fun find() {
  var i = 0;
  while (true) {
    while (true) {
      return i;
    }
  }
}
print find();
";
    assert_eq!(output_of(source), "0\n");
}

#[test]
fn bare_return_and_fallthrough_yield_nil() {
    assert_eq!(output_of("fun f() { return; } print f();"), "nil\n");
    assert_eq!(output_of("fun g() { } print g();"), "nil\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Functions as values
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn anonymous_functions_are_first_class() {
    let source = "\
var twice = fun (f, x) { return f(f(x)); };
var inc = fun (n) { return n + 1; };
print twice(inc, 1);
";
    assert_eq!(output_of(source), "3\n");
}

#[test]
fn functions_display_by_name() {
    assert_eq!(output_of("fun f() {} print f;"), "<fn f>\n");
    assert_eq!(output_of("print clock;"), "<native fn clock>\n");
    assert_eq!(output_of("print fun (a) {};"), "<fn>\n");
}

#[test]
fn clock_returns_a_positive_number_of_seconds() {
    assert_eq!(output_of("print clock() > 0;"), "true\n");
}

#[test]
fn function_values_compare_by_identity() {
    let source = "\
fun f() {}
var g = f;
print f == g;
print f == fun () {};
";
    assert_eq!(output_of(source), "true\nfalse\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Runtime errors
// ─────────────────────────────────────────────────────────────────────────

fn runtime_error_of(source: &str) -> String {
    let (output, had_error, had_runtime_error) = run(source);
    assert!(!had_error, "unexpected static error for: {}", source);
    assert!(had_runtime_error, "expected runtime error for: {}", source);
    output
}

#[test]
fn arithmetic_on_non_numbers_is_a_runtime_error() {
    runtime_error_of("print \"a\" - 1;");
    runtime_error_of("print -\"a\";");
    runtime_error_of("print 1 < \"a\";");
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    runtime_error_of("print 1 / 0;");
}

#[test]
fn undefined_variable_read_and_assign_are_runtime_errors() {
    runtime_error_of("print missing;");
    runtime_error_of("missing = 1;");
}

#[test]
fn calling_a_non_callable_is_a_runtime_error() {
    runtime_error_of("var x = 1; x();");
    runtime_error_of("\"text\"();");
}

#[test]
fn arity_mismatch_is_a_runtime_error() {
    runtime_error_of("fun f(a, b) {} f(1);");
    runtime_error_of("clock(1);");
}

#[test]
fn runtime_error_abandons_remaining_statements() {
    let output = runtime_error_of("print 1; print \"a\" - 1; print 2;");
    assert_eq!(output, "1\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Session behavior
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn state_persists_across_runs_of_one_interpreter() {
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::with_writer(Box::new(Sink(Rc::clone(&buffer))));
    let mut diagnostics = Diagnostics::new();
    let mut next_id: u32 = 0;

    run_with(
        &mut interpreter,
        &mut diagnostics,
        &mut next_id,
        "var a = 1; fun next() { a = a + 1; return a; }",
    );
    diagnostics.reset();

    run_with(
        &mut interpreter,
        &mut diagnostics,
        &mut next_id,
        "print next(); print next(); print a;",
    );

    assert!(!diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());

    let output = String::from_utf8(buffer.borrow().clone()).expect("output is utf-8");
    assert_eq!(output, "2\n3\n3\n");
}

#[test]
fn failed_line_does_not_poison_a_session() {
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::with_writer(Box::new(Sink(Rc::clone(&buffer))));
    let mut diagnostics = Diagnostics::new();
    let mut next_id: u32 = 0;

    run_with(&mut interpreter, &mut diagnostics, &mut next_id, "var a =;");
    assert!(diagnostics.had_error());
    diagnostics.reset();

    run_with(
        &mut interpreter,
        &mut diagnostics,
        &mut next_id,
        "var a = 7; print a;",
    );

    assert!(!diagnostics.had_error());
    let output = String::from_utf8(buffer.borrow().clone()).expect("output is utf-8");
    assert_eq!(output, "7\n");
}

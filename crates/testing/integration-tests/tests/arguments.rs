//! Argument binding for methods, blocks and lambdas

use integration_tests::{EvalError, Value, run};

fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().copied().map(Value::Int).collect())
}

fn raised_class(result: &Result<Value, EvalError>) -> Option<&str> {
    match result {
        Err(EvalError::Raised { class, .. }) => Some(class),
        _ => None,
    }
}

const OPTIONAL_AND_REST: &str = "def m(a, b, c = 10, *r)\n  [a, b, c, r]\nend\n";

#[test]
fn test_optional_takes_default_and_rest_is_empty() {
    let outcome = run(&format!("{OPTIONAL_AND_REST}r = m(1, 2)")).expect("translates");
    assert!(outcome.value().is_ok(), "{:?}", outcome.result);
    assert_eq!(
        outcome.local("r"),
        Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(10), ints(&[])])
    );
}

#[test]
fn test_extra_arguments_fill_optional_then_rest() {
    let outcome = run(&format!("{OPTIONAL_AND_REST}r = m(1, 2, 3, 4, 5)")).expect("translates");
    assert_eq!(
        outcome.local("r"),
        Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3), ints(&[4, 5])])
    );
}

#[test]
fn test_method_called_without_arguments_raises() {
    let outcome = run(&format!("{OPTIONAL_AND_REST}m")).expect("translates");
    assert_eq!(raised_class(&outcome.result), Some("ArgumentError"));
}

#[test]
fn test_argument_error_can_be_rescued() {
    let source = format!("{OPTIONAL_AND_REST}r = begin\n  m(1)\nrescue ArgumentError\n  :rescued\nend");
    let outcome = run(&source).expect("translates");
    assert_eq!(outcome.local("r"), Value::sym("rescued"));
}

#[test]
fn test_post_arguments_bind_from_the_end() {
    let source = "def m(a, *r, z)\n  [a, r, z]\nend\nx = m(1, 2, 3, 4)\ny = m(1, 2)";
    let outcome = run(source).expect("translates");
    assert_eq!(
        outcome.local("x"),
        Value::array(vec![Value::Int(1), ints(&[2, 3]), Value::Int(4)])
    );
    assert_eq!(outcome.local("y"), Value::array(vec![Value::Int(1), ints(&[]), Value::Int(2)]));
}

#[test]
fn test_optional_default_sees_earlier_parameters() {
    let outcome = run("def m(a, b = a * 2)\n  b\nend\nr = m(4)").expect("translates");
    assert_eq!(outcome.local("r"), Value::Int(8));
}

#[test]
fn test_block_missing_arguments_are_nil() {
    let source = "r = nil\ndef one\n  yield 1\nend\none { |a, b| r = [a, b] }";
    let outcome = run(source).expect("translates");
    assert!(outcome.value().is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.local("r"), Value::array(vec![Value::Int(1), Value::Nil]));
}

#[test]
fn test_block_destructures_a_single_array() {
    let outcome = run("r = nil\n[[1, 2]].each { |a, b| r = a + b }").expect("translates");
    assert_eq!(outcome.local("r"), Value::Int(3));
}

#[test]
fn test_block_with_one_parameter_keeps_the_array() {
    let outcome = run("r = nil\n[[1, 2]].each { |a| r = a }").expect("translates");
    assert_eq!(outcome.local("r"), ints(&[1, 2]));
}

#[test]
fn test_block_ignores_extra_arguments() {
    let source = "r = nil\ndef three\n  yield 1, 2, 3\nend\nthree { |a, b| r = [a, b] }";
    let outcome = run(source).expect("translates");
    assert_eq!(outcome.local("r"), ints(&[1, 2]));
}

#[test]
fn test_lambda_checks_its_arguments() {
    let outcome = run("f = ->(a, b) { a + b }\nr = f.call(1, 2)\nf.call(1)").expect("translates");
    assert_eq!(outcome.local("r"), Value::Int(3));
    assert_eq!(raised_class(&outcome.result), Some("ArgumentError"));
}

#[test]
fn test_keyword_arguments() {
    let source = "def m(a, k: 2, **rest)\n  [a, k, rest]\nend\nx = m(1)\ny = m(1, k: 5, z: 6)";
    let outcome = run(source).expect("translates");
    assert!(outcome.value().is_ok(), "{:?}", outcome.result);
    assert_eq!(
        outcome.local("x"),
        Value::array(vec![Value::Int(1), Value::Int(2), Value::hash(Vec::new())])
    );
    assert_eq!(
        outcome.local("y"),
        Value::array(vec![
            Value::Int(1),
            Value::Int(5),
            Value::hash(vec![(Value::sym("z"), Value::Int(6))]),
        ])
    );
}

#[test]
fn test_block_parameter_receives_the_block() {
    let source = "def m(&blk)\n  blk.call(20)\nend\nr = m { |x| x + 1 }";
    let outcome = run(source).expect("translates");
    assert_eq!(outcome.local("r"), Value::Int(21));
}

#[test]
fn test_splatted_call_arguments() {
    let source = "def m(a, b, c)\n  a + b + c\nend\nlist = [2, 3]\nr = m(1, *list)";
    let outcome = run(source).expect("translates");
    assert_eq!(outcome.local("r"), Value::Int(6));
}

//! Multiple, operator and element assignment

use integration_tests::{Value, run};

fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().copied().map(Value::Int).collect())
}

#[test]
fn test_multiple_assignment_forms_bind_alike() {
    for source in ["a, b = 1, 2", "a, b = [1, 2]", "pair = [1, 2]\na, b = pair"] {
        let outcome = run(source).expect("translates");
        assert!(outcome.value().is_ok(), "{source}: {:?}", outcome.result);
        assert_eq!(outcome.local("a"), Value::Int(1), "{source}");
        assert_eq!(outcome.local("b"), Value::Int(2), "{source}");
    }
}

#[test]
fn test_parallel_assignment_swaps() {
    let outcome = run("a = 1\nb = 2\na, b = b, a").expect("translates");
    assert_eq!(outcome.local("a"), Value::Int(2));
    assert_eq!(outcome.local("b"), Value::Int(1));
}

#[test]
fn test_splat_targets() {
    let outcome = run("a, *b = 1, 2, 3\n*c, d = [4, 5, 6]\ne, *f, g = [7, 8]").expect("translates");
    assert!(outcome.value().is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.local("a"), Value::Int(1));
    assert_eq!(outcome.local("b"), ints(&[2, 3]));
    assert_eq!(outcome.local("c"), ints(&[4, 5]));
    assert_eq!(outcome.local("d"), Value::Int(6));
    assert_eq!(outcome.local("e"), Value::Int(7));
    assert_eq!(outcome.local("f"), ints(&[]));
    assert_eq!(outcome.local("g"), Value::Int(8));
}

#[test]
fn test_nested_destructuring() {
    let outcome = run("a, (b, c), d = 1, [2, 3], 4").expect("translates");
    assert_eq!(outcome.local("a"), Value::Int(1));
    assert_eq!(outcome.local("b"), Value::Int(2));
    assert_eq!(outcome.local("c"), Value::Int(3));
    assert_eq!(outcome.local("d"), Value::Int(4));
}

#[test]
fn test_destructuring_a_non_array_binds_the_first_target() {
    let outcome = run("a, b = 5").expect("translates");
    assert_eq!(outcome.local("a"), Value::Int(5));
    assert_eq!(outcome.local("b"), Value::Nil);
}

#[test]
fn test_element_operator_assignment_evaluates_operands_once() {
    let source = "$box = [10]\ndef box\n  $box\nend\ndef key\n  0\nend\nbox()[key()] += 5";
    let outcome = run(source).expect("translates");
    assert!(outcome.value().is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.global("$box"), ints(&[15]));
    assert_eq!(outcome.calls_to("box"), 1);
    assert_eq!(outcome.calls_to("key"), 1);
    assert_eq!(outcome.calls_to("[]"), 1);
    assert_eq!(outcome.calls_to("[]="), 1);
    assert_eq!(outcome.calls_to("+"), 1);
}

#[test]
fn test_element_or_assignment_skips_the_write_when_set() {
    let source = "$h = {}\ndef h\n  $h\nend\nh()[:a] ||= 1\nh()[:a] ||= 2";
    let outcome = run(source).expect("translates");
    assert!(outcome.value().is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.global("$h"), Value::hash(vec![(Value::sym("a"), Value::Int(1))]));
    assert_eq!(outcome.calls_to("h"), 2);
    assert_eq!(outcome.calls_to("[]"), 2);
    assert_eq!(outcome.calls_to("[]="), 1);
}

#[test]
fn test_local_operator_assignment() {
    let outcome = run("a = nil\na ||= 3\na &&= a + 1\nb = 10\nb -= 4").expect("translates");
    assert_eq!(outcome.local("a"), Value::Int(4));
    assert_eq!(outcome.local("b"), Value::Int(6));
}

#[test]
fn test_element_assignment_evaluates_to_the_value() {
    let outcome = run("list = [1, 2]\nr = (list[0] = 9)").expect("translates");
    assert_eq!(outcome.local("r"), Value::Int(9));
    assert_eq!(outcome.local("list"), ints(&[9, 2]));
}

//! Conditionals, loops, jumps and exceptions

use integration_tests::{EvalError, Value, run, translate};

#[test]
fn test_case_picks_the_matching_branch() {
    let outcome = run("r = case 5\nwhen 1, 2 then :a\nwhen 5 then :b\nelse :c\nend").expect("translates");
    assert_eq!(outcome.local("r"), Value::sym("b"));
    assert_eq!(outcome.calls_to("==="), 3);
}

#[test]
fn test_case_evaluates_the_subject_once() {
    let source = "def subject\n  5\nend\nr = case subject\nwhen 1, 2 then :a\nwhen 5 then :b\nelse :c\nend";
    let unit = translate(source).expect("translates");
    assert_eq!(unit.render().matches("(lasgn %case_").count(), 1);

    let outcome = integration_tests::execute(&unit);
    assert_eq!(outcome.local("r"), Value::sym("b"));
    assert_eq!(outcome.calls_to("subject"), 1);
}

#[test]
fn test_case_falls_through_to_else() {
    let outcome = run("r = case 9\nwhen 1..3 then :low\nwhen Integer then :int\nend\ns = case 9\nwhen 1 then :one\nelse :other\nend")
        .expect("translates");
    assert_eq!(outcome.local("r"), Value::sym("int"));
    assert_eq!(outcome.local("s"), Value::sym("other"));
}

#[test]
fn test_case_with_splat_candidates() {
    let outcome = run("list = [3, 4]\nr = case 4\nwhen *list then :hit\nelse :miss\nend").expect("translates");
    assert_eq!(outcome.local("r"), Value::sym("hit"));
}

#[test]
fn test_while_with_next_and_break() {
    let source = "i = 0\ntotal = 0\nwhile i < 10\n  i += 1\n  next if i % 2 == 1\n  break if i > 6\n  total += i\nend";
    let outcome = run(source).expect("translates");
    assert!(outcome.value().is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.local("i"), Value::Int(8));
    assert_eq!(outcome.local("total"), Value::Int(12));
}

#[test]
fn test_until_and_do_while() {
    let outcome = run("n = 0\nn += 1 until n == 3\nm = 10\nbegin\n  m += 1\nend while m < 5").expect("translates");
    assert_eq!(outcome.local("n"), Value::Int(3));
    assert_eq!(outcome.local("m"), Value::Int(11));
}

#[test]
fn test_break_out_of_a_block_ends_the_call() {
    let outcome = run("r = [1, 2, 3].each { |x| break x * 100 if x == 2 }").expect("translates");
    assert_eq!(outcome.local("r"), Value::Int(200));
}

#[test]
fn test_next_in_a_block_gives_the_block_value() {
    let outcome = run("r = [1, 2, 3].map { |x| next 0 if x == 2\n x }").expect("translates");
    assert_eq!(
        outcome.local("r"),
        Value::array(vec![Value::Int(1), Value::Int(0), Value::Int(3)])
    );
}

#[test]
fn test_return_from_a_block_leaves_the_method() {
    let source = "def find\n  [1, 2, 3].each { |x| return x * 10 if x == 2 }\n  :none\nend\nr = find";
    let outcome = run(source).expect("translates");
    assert_eq!(outcome.local("r"), Value::Int(20));
}

#[test]
fn test_return_from_a_lambda_stays_in_the_lambda() {
    let source = "def m\n  f = -> { return 1 }\n  v = f.call\n  v + 1\nend\nr = m";
    let outcome = run(source).expect("translates");
    assert_eq!(outcome.local("r"), Value::Int(2));
}

#[test]
fn test_yield_from_a_block_reaches_the_method_block() {
    let source = "def twice\n  [1, 2].each { |x| yield x * 2 }\nend\nseen = []\ntwice { |v| seen.push(v) }";
    let outcome = run(source).expect("translates");
    assert_eq!(outcome.local("seen"), Value::array(vec![Value::Int(2), Value::Int(4)]));
}

#[test]
fn test_rescue_and_retry() {
    let source = "attempts = 0\nr = begin\n  attempts += 1\n  raise \"boom\" if attempts < 3\n  :done\nrescue\n  retry\nend";
    let outcome = run(source).expect("translates");
    assert_eq!(outcome.local("attempts"), Value::Int(3));
    assert_eq!(outcome.local("r"), Value::sym("done"));
}

#[test]
fn test_rescue_binds_the_exception() {
    let source = "r = begin\n  raise ArgumentError, \"bad\"\nrescue TypeError\n  :type\nrescue ArgumentError => e\n  e.message\nend";
    let outcome = run(source).expect("translates");
    assert_eq!(outcome.local("r"), Value::str("bad"));
}

#[test]
fn test_unmatched_rescue_propagates() {
    let outcome = run("begin\n  raise \"boom\"\nrescue TypeError\n  1\nend").expect("translates");
    assert_eq!(
        outcome.result,
        Err(EvalError::Raised {
            class: "RuntimeError".to_string(),
            message: "boom".to_string(),
        })
    );
}

#[test]
fn test_else_and_ensure() {
    let source = "log = []\nr = begin\n  1\nrescue\n  2\nelse\n  3\nensure\n  log.push(:ensured)\nend";
    let outcome = run(source).expect("translates");
    assert_eq!(outcome.local("r"), Value::Int(3));
    assert_eq!(outcome.local("log"), Value::array(vec![Value::sym("ensured")]));
}

#[test]
fn test_retry_outside_rescue_is_an_error() {
    let outcome = run("retry").expect("translates");
    assert!(matches!(
        outcome.result,
        Err(EvalError::Raised { ref class, .. }) if class == "SyntaxError"
    ));
}

#[test]
fn test_flip_flop_selects_a_run() {
    let source = "r = []\n(1..10).each { |i| r.push(i) if (i == 3)..(i == 5) }";
    let outcome = run(source).expect("translates");
    assert_eq!(
        outcome.local("r"),
        Value::array(vec![Value::Int(3), Value::Int(4), Value::Int(5)])
    );
}

#[test]
fn test_flip_flop_state_resets_per_call() {
    let source = "def pick(list)\n  out = []\n  list.each { |i| out.push(i) if (i == 2)..(i == 9) }\n  out\nend\na = pick([1, 2, 3])\nb = pick([1, 3])";
    let outcome = run(source).expect("translates");
    assert_eq!(outcome.local("a"), Value::array(vec![Value::Int(2), Value::Int(3)]));
    assert_eq!(outcome.local("b"), Value::array(Vec::new()));
}

#[test]
fn test_and_or_not() {
    let outcome = run("a = nil || 2\nb = 1 && nil\nc = !a\nd = (false or :x)").expect("translates");
    assert_eq!(outcome.local("a"), Value::Int(2));
    assert_eq!(outcome.local("b"), Value::Nil);
    assert_eq!(outcome.local("c"), Value::Bool(false));
    assert_eq!(outcome.local("d"), Value::sym("x"));
}

#[test]
fn test_string_interpolation() {
    let outcome = run("name = \"garnet\"\nn = 2\nr = \"#{name} x#{n}\"").expect("translates");
    assert_eq!(outcome.local("r"), Value::str("garnet x2"));
}

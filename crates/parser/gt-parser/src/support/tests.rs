use super::nodes::{arg_append, literal_concat, new_when_node};
use super::*;
use gt_diagnostics::DiagnosticSink;
use gt_syntax::RegexpOptions;

fn pos() -> Position {
    Position::new(FileId(0), 1, Span::new(0, 1))
}

fn node(kind: NodeKind) -> Node {
    Node::new(kind, pos())
}

fn str_node(text: &str) -> Node {
    node(NodeKind::Str(text.as_bytes().to_vec()))
}

fn sink(verbose: bool) -> DiagnosticSink {
    DiagnosticSink::new("t.rb", FileId(0), verbose)
}

#[test]
fn test_identifier_resolution_follows_scope_kind() {
    let mut sink = sink(false);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    support.assign_local("outer", None, pos());
    support.push_block_scope(0);
    support.assign_local("inner", None, pos());

    assert_eq!(support.declare_identifier("outer", pos()).kind, NodeKind::LocalVar("outer".into()));
    assert_eq!(support.declare_identifier("inner", pos()).kind, NodeKind::DVar("inner".into()));
    assert_eq!(support.declare_identifier("puts", pos()).kind, NodeKind::VCall("puts".into()));
}

#[test]
fn test_assignment_in_block_reuses_outer_local() {
    let mut sink = sink(false);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    support.assign_local("x", None, pos());
    support.push_block_scope(0);
    let assign = support.assign_local("x", None, pos());
    assert!(matches!(assign.kind, NodeKind::LocalAsgn { .. }));
    let fresh = support.assign_local("y", None, pos());
    assert!(matches!(fresh.kind, NodeKind::DAsgn { .. }));
    let closed = support.pop_current_scope().expect("balanced");
    assert_eq!(closed.locals, vec!["y"]);
}

#[test]
fn test_invalid_assignment_targets() {
    let mut sink = sink(false);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    let message = |result: PResult<Node>| result.expect_err("rejected").to_string();

    assert_eq!(
        message(support.assignable(&Variable::Keyword(Keyword::SelfKw), None, pos())),
        "Can't change the value of self"
    );
    assert_eq!(
        message(support.assignable(&Variable::Keyword(Keyword::Nil), None, pos())),
        "Can't assign to nil"
    );
    assert_eq!(
        message(support.assignable(&Variable::NthRef(1), None, pos())),
        "Can't set variable $1."
    );
    support.in_def = true;
    assert_eq!(
        message(support.assignable(&Variable::Const("A".into()), None, pos())),
        "dynamic constant assignment"
    );
}

#[test]
fn test_arg_append_shapes() {
    let single = arg_append(None, node(NodeKind::Fixnum(1)));
    assert!(matches!(&single.kind, NodeKind::Array(items) if items.len() == 1));

    let splat = node(NodeKind::Splat(Box::new(node(NodeKind::VCall("a".into())))));
    let pushed = arg_append(Some(splat), node(NodeKind::Fixnum(2)));
    assert_eq!(pushed.kind.name(), "ArgsPush");

    let cat = arg_append(Some(pushed), node(NodeKind::Fixnum(3)));
    let NodeKind::ArgsCat { second, .. } = cat.kind else {
        panic!("expected ArgsCat");
    };
    assert!(matches!(&second.kind, NodeKind::Array(items) if items.len() == 2));
}

#[test]
fn test_literal_concat_merges_strings() {
    let joined = literal_concat(Some(str_node("ab")), str_node("cd"));
    assert_eq!(joined.kind, NodeKind::Str(b"abcd".to_vec()));

    let interpolated = node(NodeKind::EvStr(Some(Box::new(node(NodeKind::VCall("x".into()))))));
    let dstr = literal_concat(Some(str_node("")), interpolated);
    let NodeKind::DStr(parts) = dstr.kind else {
        panic!("expected DStr");
    };
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].kind.name(), "EvStr");

    let tail = literal_concat(Some(node(NodeKind::DStr(parts))), str_node("!"));
    assert!(matches!(&tail.kind, NodeKind::DStr(parts) if parts.len() == 2));
}

#[test]
fn test_match_with_regexp_literal_declares_captures() {
    let mut sink = sink(false);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    let regexp = node(NodeKind::Regexp {
        source: b"(?<year>\\d+)".to_vec(),
        options: RegexpOptions::default(),
    });
    let matched = support
        .get_match_node(regexp, node(NodeKind::VCall("line".into())))
        .expect("match");
    assert_eq!(matched.kind.name(), "Match2");
    assert!(support.is_local("year"));

    let reversed = support
        .get_match_node(
            node(NodeKind::VCall("line".into())),
            node(NodeKind::Regexp {
                source: b"(?<day>x)".to_vec(),
                options: RegexpOptions::default(),
            }),
        )
        .expect("match");
    assert_eq!(reversed.kind.name(), "Match3");
    assert!(!support.is_local("day"));
}

#[test]
fn test_named_captures_skip_reserved_words_and_warn_on_conflict() {
    let mut sink = sink(true);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    support.assign_local("year", None, pos());
    let regexp = node(NodeKind::Regexp {
        source: b"(?<end>a)(?<self>b)(?<year>c)(?<day>d)".to_vec(),
        options: RegexpOptions::default(),
    });
    support
        .get_match_node(regexp, node(NodeKind::VCall("line".into())))
        .expect("match");
    assert!(!support.is_local("end"));
    assert!(!support.is_local("self"));
    assert!(support.is_local("day"));
    drop(support);

    let warnings: Vec<_> = sink
        .with_id(DiagnosticId::NamedCaptureConflict)
        .map(|diagnostic| diagnostic.message.as_str())
        .collect();
    assert_eq!(warnings, vec!["named capture conflicts a local variable - year"]);
}

#[test]
fn test_capture_local_names_filters_keywords() {
    assert_eq!(capture_local_names(b"(?<nil>a)(?<if>b)(?<x>c)"), vec!["x"]);
}

#[test]
fn test_inline_source_flip_flop_compares_integers_with_line_number() {
    let range = || {
        node(NodeKind::Dot {
            begin: Box::new(node(NodeKind::Fixnum(1))),
            end: Box::new(node(NodeKind::VCall("done".into()))),
            exclusive: false,
        })
    };

    let mut sink = sink(false);
    let mut support = ParserSupport::new(&mut sink, "-e", "UTF-8", true, false);
    let NodeKind::Flip { begin, end, .. } = support.get_condition_node(Some(range())).expect("cond").kind else {
        panic!("expected Flip");
    };
    let NodeKind::Call {
        receiver, name, args, ..
    } = begin.kind
    else {
        panic!("expected Call");
    };
    assert_eq!(receiver.kind, NodeKind::Fixnum(1));
    assert_eq!(name, "==");
    let Some(NodeKind::Array(items)) = args.map(|args| args.kind) else {
        panic!("expected argument list");
    };
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, NodeKind::GlobalVar("$.".into()));
    assert_eq!(end.kind, NodeKind::VCall("done".into()));

    let mut sink = self::sink(false);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    let NodeKind::Flip { begin, end, .. } = support.get_condition_node(Some(range())).expect("cond").kind else {
        panic!("expected Flip");
    };
    assert_eq!(begin.kind, NodeKind::Fixnum(1));
    assert_eq!(end.kind, NodeKind::VCall("done".into()));
}

#[test]
fn test_void_value_expression() {
    let mut sink = sink(false);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    let ret = node(NodeKind::Return(None));
    let error = support.check_expression(&ret).expect_err("void");
    assert_eq!(error.to_string(), "void value expression");

    let guarded = node(NodeKind::And(Box::new(node(NodeKind::True)), Box::new(ret)));
    assert!(support.check_expression(&guarded).is_ok());
}

#[test]
fn test_condition_rewrites_ranges_and_regexps() {
    let mut sink = sink(true);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    let range = node(NodeKind::Dot {
        begin: Box::new(node(NodeKind::VCall("a".into()))),
        end: Box::new(node(NodeKind::VCall("b".into()))),
        exclusive: false,
    });
    assert_eq!(support.get_condition_node(Some(range)).expect("cond").kind.name(), "Flip");

    let literal_range = node(NodeKind::Dot {
        begin: Box::new(node(NodeKind::Fixnum(1))),
        end: Box::new(node(NodeKind::Fixnum(2))),
        exclusive: false,
    });
    assert_eq!(support.get_condition_node(Some(literal_range)).expect("cond").kind.name(), "Dot");

    let regexp = node(NodeKind::Regexp {
        source: b"x".to_vec(),
        options: RegexpOptions::default(),
    });
    assert_eq!(support.get_condition_node(Some(regexp)).expect("cond").kind.name(), "Match");
    drop(support);
    assert_eq!(sink.with_id(DiagnosticId::RegexpLiteralInCondition).count(), 1);
}

#[test]
fn test_static_assignment_in_condition_warns() {
    let mut sink = sink(false);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    let assign = support.assign_local("x", Some(Box::new(node(NodeKind::Fixnum(1)))), pos());
    support.get_condition_node(Some(assign)).expect("cond");
    let dynamic = support.assign_local("y", Some(Box::new(node(NodeKind::VCall("z".into())))), pos());
    support.get_condition_node(Some(dynamic)).expect("cond");
    drop(support);
    let warnings: Vec<_> = sink.with_id(DiagnosticId::AssignmentInCondition).collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "found = in conditional, should be ==");
}

#[test]
fn test_duplicate_hash_keys_warn() {
    let mut sink = sink(false);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    let pairs = vec![
        (Some(node(NodeKind::Symbol("a".into()))), node(NodeKind::Fixnum(1))),
        (Some(node(NodeKind::Symbol("a".into()))), node(NodeKind::Fixnum(2))),
    ];
    let kept = support.remove_duplicate_keys(pairs, pos());
    assert_eq!(kept.len(), 2);
    drop(support);
    assert_eq!(
        sink.diagnostics()[0].message,
        "key :a is duplicated and overwritten on line 1"
    );
}

#[test]
fn test_parameter_names() {
    let mut sink = sink(true);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    support.assign_local("x", None, pos());
    support.push_block_scope(0);
    assert_eq!(support.arg_var("_"), "_");
    assert_eq!(support.arg_var("_"), "_$0");
    support.shadowing_lvar("x", pos()).expect("only a warning");
    support.arg_var("x");
    let duplicate = support.shadowing_lvar("x", pos()).expect_err("duplicate");
    assert_eq!(duplicate.to_string(), "duplicated argument name");
    let constant = support.formal_argument(&Variable::Const("A".into()), pos());
    assert_eq!(
        constant.expect_err("constant").to_string(),
        "formal argument cannot be a constant"
    );
    drop(support);
    assert_eq!(sink.with_id(DiagnosticId::ShadowingOuterLocal).count(), 1);
}

#[test]
fn test_return_values_and_when_candidates() {
    let mut sink = sink(false);
    let mut support = ParserSupport::new(&mut sink, "t.rb", "UTF-8", false, false);
    let single = CallArgs {
        args: Some(node(NodeKind::Array(vec![node(NodeKind::Fixnum(1))]))),
        block: None,
    };
    let value = support.ret_args(single, pos()).expect("value").expect("present");
    assert_eq!(value.kind, NodeKind::Fixnum(1));

    let splat = CallArgs {
        args: Some(node(NodeKind::Splat(Box::new(node(NodeKind::VCall("a".into())))))),
        block: None,
    };
    let value = support.ret_args(splat, pos()).expect("value").expect("present");
    assert_eq!(value.kind.name(), "SValue");

    let candidates = node(NodeKind::ArgsCat {
        first: Box::new(node(NodeKind::Array(vec![node(NodeKind::Fixnum(1))]))),
        second: Box::new(node(NodeKind::VCall("rest".into()))),
    });
    let clause = new_when_node(candidates, None, pos());
    let names: Vec<_> = clause.candidates.iter().map(|candidate| candidate.kind.name()).collect();
    assert_eq!(names, vec!["Fixnum", "Splat"]);
}

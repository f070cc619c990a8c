use crate::{ParseResult, ParserConfig, parse};
use expect_test::{Expect, expect};
use gt_diagnostics::{DiagnosticId, DiagnosticSink};
use gt_span::FileId;
use gt_syntax::{Node, NodeKind, Param};

fn parse_source(source: &str) -> (Result<ParseResult, crate::ParseError>, DiagnosticSink) {
    let mut sink = DiagnosticSink::new("t.rb", FileId(0), false);
    let result = parse(source.as_bytes(), &ParserConfig::default(), &mut sink);
    (result, sink)
}

fn parse_ok(source: &str) -> (Node, Vec<String>) {
    let (result, sink) = parse_source(source);
    match result {
        Ok(parsed) => (parsed.root, parsed.locals),
        Err(error) => panic!("{source:?} failed to parse: {error} ({:?})", sink.diagnostics()),
    }
}

fn parse_err(source: &str) -> String {
    let (result, _) = parse_source(source);
    match result {
        Ok(parsed) => panic!("{source:?} parsed unexpectedly: {:?}", parsed.root),
        Err(error) => error.as_syntax().map(|error| error.message.clone()).unwrap_or_default(),
    }
}

fn statements(root: Node) -> Vec<Node> {
    match root.kind {
        NodeKind::Block(nodes) => nodes,
        _ => vec![root],
    }
}

/// Compact s-expression of the shapes the precedence tests care about
fn sexp(node: &Node) -> String {
    let opt = |node: &Option<Box<Node>>| node.as_deref().map_or_else(|| "nil".to_string(), sexp);
    match &node.kind {
        NodeKind::Fixnum(value) => value.to_string(),
        NodeKind::Float(value) => value.to_string(),
        NodeKind::Symbol(name) => format!(":{name}"),
        NodeKind::Str(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
        NodeKind::VCall(name) | NodeKind::LocalVar(name) | NodeKind::DVar(name) | NodeKind::Const(name) => {
            name.clone()
        }
        NodeKind::Array(items) => {
            let items: Vec<_> = items.iter().map(sexp).collect();
            format!("[{}]", items.join(" "))
        }
        NodeKind::Call {
            receiver, name, args, ..
        } => match args.as_deref().map(|args| &args.kind) {
            Some(NodeKind::Array(items)) => {
                let items: Vec<_> = items.iter().map(sexp).collect();
                format!("(call {} {name} {})", sexp(receiver), items.join(" "))
            }
            Some(_) => format!("(call {} {name} {})", sexp(receiver), opt(args)),
            None => format!("(call {} {name})", sexp(receiver)),
        },
        NodeKind::And(left, right) => format!("(and {} {})", sexp(left), sexp(right)),
        NodeKind::Or(left, right) => format!("(or {} {})", sexp(left), sexp(right)),
        NodeKind::If {
            cond,
            then_body,
            else_body,
        } => format!("(if {} {} {})", sexp(cond), opt(then_body), opt(else_body)),
        NodeKind::Dot { begin, end, exclusive } => {
            format!("({} {} {})", if *exclusive { "dot3" } else { "dot2" }, sexp(begin), sexp(end))
        }
        NodeKind::LocalAsgn { name, value } | NodeKind::DAsgn { name, value } => {
            format!("(lasgn {name} {})", opt(value))
        }
        kind => kind.name().to_string(),
    }
}

fn check(source: &str, expected: Expect) {
    let (root, _) = parse_ok(source);
    expected.assert_eq(&sexp(&root));
}

#[test]
fn test_operator_precedence() {
    check("1 + 2 * 3", expect!["(call 1 + (call 2 * 3))"]);
    check("1 * 2 + 3 < 4 && 5", expect!["(and (call (call (call 1 * 2) + 3) < 4) 5)"]);
    check("a or b and c", expect!["(and (or a b) c)"]);
    check("1 - 2 - 3", expect!["(call (call 1 - 2) - 3)"]);
    check("2 ** 3 ** 2", expect!["(call 2 ** (call 3 ** 2))"]);
}

#[test]
fn test_negative_literals() {
    check("-2 ** 2", expect!["(call (call 2 ** 2) -@)"]);
    check("-2.5", expect!["-2.5"]);
    check("-x", expect!["(call x -@)"]);
}

#[test]
fn test_ternary_and_range() {
    check("a ? 1 : 2", expect!["(if a 1 2)"]);
    check("1..x", expect!["(dot2 1 x)"]);
    check("1...2", expect!["(dot3 1 2)"]);
}

#[test]
fn test_local_variables_shadow_method_calls() {
    let (root, locals) = parse_ok("x = 1\nx\ny");
    let nodes = statements(root);
    assert_eq!(nodes.len(), 3);
    assert!(matches!(nodes[0].kind, NodeKind::LocalAsgn { ref name, .. } if name == "x"));
    assert_eq!(nodes[1].kind, NodeKind::LocalVar("x".into()));
    assert_eq!(nodes[2].kind, NodeKind::VCall("y".into()));
    assert_eq!(locals, vec!["x"]);
}

#[test]
fn test_multiple_assignment() {
    let (root, locals) = parse_ok("a, b = 1, 2");
    let NodeKind::MultipleAsgn(masgn) = root.kind else {
        panic!("expected MultipleAsgn, got {:?}", root.kind);
    };
    assert_eq!(masgn.pre.len(), 2);
    assert!(masgn.rest.is_none());
    let value = masgn.value.expect("value");
    assert_eq!(sexp(&value), "[1 2]");
    assert_eq!(locals, vec!["a", "b"]);
}

#[test]
fn test_multiple_assignment_with_splat_and_nesting() {
    let (root, _) = parse_ok("a, *b, c = list");
    let NodeKind::MultipleAsgn(masgn) = root.kind else {
        panic!("expected MultipleAsgn");
    };
    assert_eq!(masgn.pre.len(), 1);
    assert!(matches!(masgn.rest.as_deref().map(|rest| &rest.kind), Some(NodeKind::LocalAsgn { name, .. }) if name == "b"));
    assert_eq!(masgn.post.len(), 1);
    assert_eq!(masgn.value.map(|value| value.kind), Some(NodeKind::VCall("list".into())));

    let (root, locals) = parse_ok("(a, b), c = x");
    let NodeKind::MultipleAsgn(masgn) = root.kind else {
        panic!("expected MultipleAsgn");
    };
    assert_eq!(masgn.pre.len(), 2);
    assert!(matches!(&masgn.pre[0].kind, NodeKind::MultipleAsgn(inner) if inner.pre.len() == 2));
    assert_eq!(locals, vec!["a", "b", "c"]);
}

#[test]
fn test_command_call_takes_do_block() {
    let (root, _) = parse_ok("foo bar do |x| x end");
    let NodeKind::FCall { name, args, iter } = root.kind else {
        panic!("expected FCall, got {:?}", root.kind);
    };
    assert_eq!(name, "foo");
    assert_eq!(args.map(|args| sexp(&args)).as_deref(), Some("[bar]"));
    let Some(NodeKind::Iter(iter)) = iter.map(|iter| iter.kind) else {
        panic!("expected a block");
    };
    let params = iter.args.expect("block params");
    assert_eq!(params.pre, vec![Param::Required("x".into())]);
    assert_eq!(iter.body.map(|body| body.kind), Some(NodeKind::DVar("x".into())));
    assert_eq!(iter.locals, vec!["x"]);
}

#[test]
fn test_brace_block_binds_to_nearest_call() {
    let (root, _) = parse_ok("foo bar { 1 }");
    let NodeKind::FCall { args, iter, .. } = root.kind else {
        panic!("expected FCall");
    };
    assert!(iter.is_none());
    let Some(NodeKind::Array(items)) = args.map(|args| args.kind) else {
        panic!("expected arguments");
    };
    assert!(matches!(&items[0].kind, NodeKind::FCall { name, iter: Some(_), .. } if name == "bar"));
}

#[test]
fn test_block_writes_outer_local() {
    let (root, locals) = parse_ok("x = 1; [1].each { |y| x = y }");
    let nodes = statements(root);
    let NodeKind::Call { name, iter, .. } = &nodes[1].kind else {
        panic!("expected Call");
    };
    assert_eq!(name, "each");
    let Some(NodeKind::Iter(iter)) = iter.as_deref().map(|iter| &iter.kind) else {
        panic!("expected a block");
    };
    assert_eq!(iter.body.as_deref().map(sexp).as_deref(), Some("(lasgn x y)"));
    assert!(matches!(
        iter.body.as_deref().map(|body| &body.kind),
        Some(NodeKind::LocalAsgn { .. })
    ));
    assert_eq!(iter.locals, vec!["y"]);
    assert_eq!(locals, vec!["x"]);
}

#[test]
fn test_op_assign_forms() {
    let (root, _) = parse_ok("a ||= 1");
    let NodeKind::OpAsgnOr { first, second } = root.kind else {
        panic!("expected OpAsgnOr");
    };
    assert_eq!(first.kind, NodeKind::LocalVar("a".into()));
    assert_eq!(sexp(&second), "(lasgn a 1)");

    let (root, _) = parse_ok("h[k] += 1");
    let NodeKind::OpElementAsgn {
        receiver,
        args,
        operator,
        value,
    } = root.kind
    else {
        panic!("expected OpElementAsgn");
    };
    assert_eq!(receiver.kind, NodeKind::VCall("h".into()));
    assert_eq!(args.map(|args| sexp(&args)).as_deref(), Some("[k]"));
    assert_eq!(operator, "+");
    assert_eq!(value.kind, NodeKind::Fixnum(1));

    let (root, _) = parse_ok("o.x -= 2");
    assert!(matches!(
        root.kind,
        NodeKind::OpAsgn { ref attribute, ref operator, .. } if attribute == "x" && operator == "-"
    ));

    let (root, _) = parse_ok("b = 1; b += 2");
    let nodes = statements(root);
    assert_eq!(sexp(&nodes[1]), "(lasgn b (call b + 2))");
}

#[test]
fn test_case_with_splat_candidate() {
    let (root, _) = parse_ok("case x\nwhen 1, *list then :a\nelse :b\nend");
    let NodeKind::Case {
        subject,
        whens,
        else_body,
    } = root.kind
    else {
        panic!("expected Case");
    };
    assert_eq!(subject.map(|subject| subject.kind), Some(NodeKind::VCall("x".into())));
    assert_eq!(whens.len(), 1);
    let names: Vec<_> = whens[0].candidates.iter().map(Node::kind_name).collect();
    assert_eq!(names, vec!["Fixnum", "Splat"]);
    assert_eq!(else_body.map(|body| body.kind), Some(NodeKind::Symbol("b".into())));
}

#[test]
fn test_case_requires_when() {
    assert_eq!(
        parse_err("case x\nend"),
        "syntax error, unexpected keyword `end', expecting keyword `when'"
    );
}

#[test]
fn test_loop_modifiers() {
    let (root, _) = parse_ok("begin\n  x\nend while y");
    assert!(matches!(root.kind, NodeKind::While { evaluate_at_start: false, .. }));

    let (root, _) = parse_ok("foo while bar");
    assert!(matches!(root.kind, NodeKind::While { evaluate_at_start: true, .. }));

    let (root, _) = parse_ok("foo until bar");
    assert!(matches!(root.kind, NodeKind::Until { evaluate_at_start: true, .. }));
}

#[test]
fn test_range_in_condition_becomes_flip_flop() {
    let (root, _) = parse_ok("if a..b then end");
    let NodeKind::If { cond, .. } = root.kind else {
        panic!("expected If");
    };
    assert!(matches!(cond.kind, NodeKind::Flip { exclusive: false, .. }));

    let (root, _) = parse_ok("if 1..2 then end");
    let NodeKind::If { cond, .. } = root.kind else {
        panic!("expected If");
    };
    assert_eq!(cond.kind_name(), "Dot");
}

#[test]
fn test_rescue_binds_exception_variable() {
    let (root, locals) = parse_ok("begin\n  risky\nrescue Foo, Bar => e\n  e\nend");
    let NodeKind::Begin(Some(body)) = root.kind else {
        panic!("expected Begin");
    };
    let NodeKind::Rescue { body, rescues, .. } = body.kind else {
        panic!("expected Rescue");
    };
    assert_eq!(body.map(|body| body.kind), Some(NodeKind::VCall("risky".into())));
    assert_eq!(rescues.len(), 1);
    assert_eq!(rescues[0].exceptions.len(), 2);
    let Some(NodeKind::Block(clause)) = rescues[0].body.as_deref().map(|body| &body.kind) else {
        panic!("expected a clause body");
    };
    assert!(matches!(
        &clause[0].kind,
        NodeKind::LocalAsgn { name, value: Some(value) } if name == "e" && value.kind == NodeKind::GlobalVar("$!".into())
    ));
    assert_eq!(clause[1].kind, NodeKind::LocalVar("e".into()));
    assert_eq!(locals, vec!["e"]);
}

#[test]
fn test_def_with_every_parameter_kind() {
    let (root, _) = parse_ok("def m(a, b = 1, *rest, c, k: 2, **opts, &blk)\nend");
    let NodeKind::Defn {
        name,
        args,
        body,
        locals,
    } = root.kind
    else {
        panic!("expected Defn");
    };
    assert_eq!(name, "m");
    assert!(body.is_none());
    assert_eq!(args.pre, vec![Param::Required("a".into())]);
    assert_eq!(args.optional.len(), 1);
    assert_eq!(args.optional[0].default.kind, NodeKind::Fixnum(1));
    assert_eq!(args.rest, Some(Some("rest".into())));
    assert_eq!(args.post, vec![Param::Required("c".into())]);
    assert_eq!(args.keywords.len(), 1);
    assert_eq!(args.keyword_rest, Some(Some("opts".into())));
    assert_eq!(args.block.as_deref(), Some("blk"));
    assert_eq!(locals, vec!["a", "b", "rest", "c", "k", "opts", "blk"]);
}

#[test]
fn test_singleton_setter_definition() {
    let (root, _) = parse_ok("def self.value=(v)\nend");
    let NodeKind::Defs { receiver, name, .. } = root.kind else {
        panic!("expected Defs");
    };
    assert_eq!(receiver.kind, NodeKind::SelfRef);
    assert_eq!(name, "value=");
}

#[test]
fn test_duplicate_parameter_is_rejected() {
    assert_eq!(parse_err("def m(a, a)\nend"), "duplicated argument name");
}

#[test]
fn test_class_path_and_body() {
    let (root, _) = parse_ok("class A::B < C\n  X = 1\nend");
    let NodeKind::Class {
        cpath,
        superclass,
        body,
        ..
    } = root.kind
    else {
        panic!("expected Class");
    };
    let NodeKind::Colon2 { left, name } = cpath.kind else {
        panic!("expected Colon2");
    };
    assert_eq!(name, "B");
    assert_eq!(left.map(|left| left.kind), Some(NodeKind::Const("A".into())));
    assert_eq!(superclass.map(|node| node.kind), Some(NodeKind::Const("C".into())));
    assert!(matches!(
        body.map(|body| body.kind),
        Some(NodeKind::ConstDecl { name, .. }) if name == "X"
    ));
}

#[test]
fn test_definitions_rejected_inside_methods() {
    assert_eq!(parse_err("def m\n  class A\n  end\nend"), "class definition in method body");
    assert_eq!(parse_err("def m\n  X = 1\nend"), "dynamic constant assignment");
    assert_eq!(parse_err("def m\n  BEGIN { }\nend"), "BEGIN in method");
}

#[test]
fn test_keyword_arguments_collect_into_hash() {
    let (root, _) = parse_ok("foo(a: 1, 'b' => 2)");
    let NodeKind::FCall { args, .. } = root.kind else {
        panic!("expected FCall");
    };
    let Some(NodeKind::Array(items)) = args.map(|args| args.kind) else {
        panic!("expected arguments");
    };
    assert_eq!(items.len(), 1);
    let NodeKind::Hash(pairs) = &items[0].kind else {
        panic!("expected trailing hash");
    };
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].0.as_ref().map(|key| &key.kind), Some(&NodeKind::Symbol("a".into())));
    assert_eq!(pairs[1].0.as_ref().map(|key| &key.kind), Some(&NodeKind::Str(b"b".to_vec())));
}

#[test]
fn test_string_interpolation() {
    let (root, _) = parse_ok("\"a#{b}c\"");
    let NodeKind::DStr(parts) = root.kind else {
        panic!("expected DStr, got {:?}", root.kind);
    };
    let names: Vec<_> = parts.iter().map(Node::kind_name).collect();
    assert_eq!(names, vec!["Str", "EvStr", "Str"]);

    let (root, _) = parse_ok("'a' 'b'");
    assert_eq!(root.kind, NodeKind::Str(b"ab".to_vec()));
}

#[test]
fn test_word_lists() {
    let (root, _) = parse_ok("%w(a b)");
    assert_eq!(sexp(&root), "[\"a\" \"b\"]");

    let (root, _) = parse_ok("%i(x y)");
    assert_eq!(sexp(&root), "[:x :y]");
}

#[test]
fn test_regexp_match_declares_named_captures() {
    let (root, locals) = parse_ok("/(?<year>\\d+)/ =~ line\nyear");
    let nodes = statements(root);
    assert_eq!(nodes[0].kind_name(), "Match2");
    assert_eq!(nodes[1].kind, NodeKind::LocalVar("year".into()));
    assert_eq!(locals, vec!["year"]);
}

#[test]
fn test_lambda_literal() {
    let (root, _) = parse_ok("f = ->(x, y = 2) { x }");
    let NodeKind::LocalAsgn { value: Some(value), .. } = root.kind else {
        panic!("expected LocalAsgn");
    };
    let NodeKind::Lambda(lambda) = value.kind else {
        panic!("expected Lambda");
    };
    let params = lambda.args.expect("lambda params");
    assert_eq!(params.pre.len(), 1);
    assert_eq!(params.optional.len(), 1);
    assert_eq!(lambda.body.map(|body| body.kind), Some(NodeKind::DVar("x".into())));
}

#[test]
fn test_for_loop_target() {
    let (root, locals) = parse_ok("for a, b in pairs do a end");
    let NodeKind::For { var, iter, body } = root.kind else {
        panic!("expected For");
    };
    assert!(matches!(var.kind, NodeKind::MultipleAsgn(ref masgn) if masgn.pre.len() == 2));
    assert_eq!(iter.kind, NodeKind::VCall("pairs".into()));
    assert_eq!(body.map(|body| body.kind), Some(NodeKind::LocalVar("a".into())));
    assert_eq!(locals, vec!["a", "b"]);
}

#[test]
fn test_alias_and_undef() {
    let (root, _) = parse_ok("alias new_name old_name");
    assert!(matches!(root.kind, NodeKind::Alias { ref new_name, ref old_name } if new_name == "new_name" && old_name == "old_name"));

    let (root, _) = parse_ok("alias $new $old");
    assert_eq!(root.kind_name(), "VAlias");

    let (root, _) = parse_ok("undef a, b");
    let names: Vec<_> = statements(root).into_iter().map(|node| node.kind).collect();
    assert_eq!(names, vec![NodeKind::Undef("a".into()), NodeKind::Undef("b".into())]);
}

#[test]
fn test_yield_and_zsuper() {
    let (root, _) = parse_ok("def m\n  yield 1, 2\n  super\nend");
    let NodeKind::Defn { body: Some(body), .. } = root.kind else {
        panic!("expected Defn");
    };
    let nodes = statements(*body);
    assert!(matches!(&nodes[0].kind, NodeKind::Yield { unsplat: false, args: Some(args) } if sexp(args) == "[1 2]"));
    assert!(matches!(nodes[1].kind, NodeKind::ZSuper { iter: None }));
}

#[test]
fn test_begin_blocks_are_hoisted() {
    let (root, _) = parse_ok("x = 1\nBEGIN { y }");
    let nodes = statements(root);
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].kind_name(), "PreExe");
    assert_eq!(nodes[1].kind_name(), "LocalAsgn");
}

#[test]
fn test_void_value_is_rejected() {
    assert_eq!(parse_err("x = return"), "void value expression");
}

#[test]
fn test_errors_are_recorded_and_first_is_returned() {
    let (result, sink) = parse_source("1 +\n)\nx = 2\n)\n");
    let error = result.expect_err("syntax errors");
    let syntax = error.as_syntax().expect("a syntax error");
    assert_eq!(syntax.message, "syntax error, unexpected `)'");
    assert_eq!(syntax.line, 2);
    assert_eq!(sink.with_id(DiagnosticId::SyntaxError).count(), 1);
    assert_eq!(sink.with_id(DiagnosticId::CascadingSyntaxError).count(), 1);
}

#[test]
fn test_parser_warnings() {
    let (result, sink) = parse_source("if x = 1 then end");
    assert!(result.is_ok());
    assert_eq!(sink.with_id(DiagnosticId::AssignmentInCondition).count(), 1);

    let (result, sink) = parse_source("begin\n  1\nelse\n  2\nend");
    assert!(result.is_ok());
    assert_eq!(sink.with_id(DiagnosticId::ElseWithoutRescue).count(), 1);

    let (result, sink) = parse_source("{a: 1, a: 2}");
    assert!(result.is_ok());
    assert_eq!(sink.with_id(DiagnosticId::DuplicateHashKey).count(), 1);
}

#[test]
fn test_data_after_end_marker() {
    let (result, _) = parse_source("p 1\n__END__\nraw data\n");
    let parsed = result.expect("parses");
    assert_eq!(parsed.data.as_deref(), Some(&b"raw data\n"[..]));
    assert_eq!(parsed.encoding, "UTF-8");
}

use crate::{InternalError, Specializer, TranslatedRoot, Translator};
use expect_test::expect;
use gt_diagnostics::{DiagnosticId, DiagnosticSink};
use gt_exec::visitor::descendants;
use gt_exec::{ExecKind, FrameDescriptor, FrameId, MethodId};
use gt_intern::Interner;
use gt_parser::{ParserConfig, parse};
use gt_span::{FileId, Position};

fn translate(source: &str) -> (TranslatedRoot, DiagnosticSink) {
    let mut sink = DiagnosticSink::new("t.rb", FileId(0), false);
    let parsed = match parse(source.as_bytes(), &ParserConfig::default(), &mut sink) {
        Ok(parsed) => parsed,
        Err(error) => panic!("{source:?} failed to parse: {error}"),
    };
    let unit = Translator::new(&mut sink, Interner::new())
        .translate_root(&parsed)
        .expect("translates");
    (unit, sink)
}

fn render(source: &str) -> String {
    let (unit, _) = translate(source);
    unit.graph.render(unit.root)
}

/// Every block or lambda in the unit, outermost first
fn blocks(unit: &TranslatedRoot) -> Vec<(MethodId, FrameId)> {
    descendants(&unit.graph, unit.root)
        .into_iter()
        .filter_map(|id| match unit.graph[id].kind {
            ExecKind::BlockDefinition { method, frame, .. } => Some((method, frame)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_top_level_locals() {
    expect![[r#"(catch-retry (catch-next (catch-return#1 (seq (lasgn x@0 1) x@0))))"#]]
        .assert_eq(&render("x = 1\nx"));
}

#[test]
fn test_block_reads_method_local_through_capture() {
    let (unit, _) = translate("def m\n  x = 1\n  [1].each { x }\nend");
    let graph = &unit.graph;
    let x = graph.intern("x");
    let blocks = blocks(&unit);
    assert_eq!(blocks.len(), 1);
    let (method, frame) = blocks[0];

    let descriptor = graph.frame(frame);
    assert!(descriptor.captures(x));
    assert_eq!(descriptor.slot_of(x), None);
    assert!(descriptor.needs_declaration_frame);
    assert_eq!(graph.method(method).name, "(each-block)");
    assert!(graph.method(method).is_block);

    let reads: Vec<_> = descendants(graph, unit.root)
        .into_iter()
        .filter_map(|id| match graph[id].kind {
            ExecKind::ReadLocal(slot) if slot.name == x => Some((slot.depth, slot.slot)),
            _ => None,
        })
        .collect();
    assert_eq!(reads, vec![(1, 0)]);
    let text = graph.render(unit.root);
    assert!(text.contains("(block (each-block)/0 [] ^[x] (catch-retry (catch-next (catch-redo x@0^1))))"));
}

#[test]
fn test_block_local_stays_in_block_frame() {
    let (unit, _) = translate("[1].each { |y| z = y }");
    let graph = &unit.graph;
    let z = graph.intern("z");
    let (_, frame) = blocks(&unit)[0];
    assert!(graph.frame(frame).slot_of(z).is_some());
    assert!(graph.frame(unit.root_frame).slot_of(z).is_none());
    assert!(!graph.frame(frame).needs_declaration_frame);
}

#[test]
fn test_return_ids_are_per_translator() {
    let source = "def a\nend\ndef b\n  return 1\nend\n[1].each { return 2 }";
    let first = render(source);
    assert!(first.starts_with("(catch-retry (catch-next (catch-return#1 "));
    assert!(first.contains("(def a/0 [] (catch-retry (catch-next (catch-return#2 nil))))"));
    assert!(first.contains("(catch-return#3 (return#3 1))"));
    assert!(first.contains("(return#1 2)"));

    assert_eq!(render(source), first);
}

#[test]
fn test_lambda_gets_its_own_return_id() {
    let text = render("f = -> { return 1 }");
    assert!(text.contains("(lambda (lambda)/0 [] (catch-retry (catch-next (catch-return#2 (return#2 1)))))"));
}

#[test]
fn test_retranslation_is_identical() {
    let source = "def m(a, b = 2, *r)\n  case a\n  when 1, *r then b\n  end\nend\nx, y = [1, 2]\nh = {}\nh[:k] ||= x";
    let (first, _) = translate(source);
    let (second, _) = translate(source);
    assert_eq!(first.graph.render(first.root), second.graph.render(second.root));
    assert_eq!(first.graph.len(), second.graph.len());
    assert_eq!(first.graph.frames().count(), second.graph.frames().count());
}

#[test]
fn test_case_uses_one_temp_and_or_chain() {
    let text = render("case 5\nwhen 1, 2 then :a\nelse :b\nend");
    assert!(text.contains(
        "(seq (lasgn %case_1@0 5) (if (bool (or (call 1 === %case_1@0) (call 2 === %case_1@0))) :a :b))"
    ));
    assert_eq!(text.matches("(lasgn %case_").count(), 1);
}

#[test]
fn test_case_splat_candidate() {
    let text = render("case 5\nwhen *list then :a\nend");
    assert!(text.contains("(when-splat %case_1@0 (splat (fcall list)))"));
}

#[test]
fn test_case_without_subject_tests_candidates() {
    let text = render("case\nwhen true then 1\nend");
    assert!(text.contains("(if (bool true) 1 nil)"));
    assert!(!text.contains("%case_"));
}

#[test]
fn test_method_parameters_raise_when_missing() {
    let (unit, _) = translate("def m(a, b, c = 1, *r)\nend");
    let text = unit.graph.render(unit.root);
    assert!(text.contains("(def m/2+ [a b c r]"));
    assert!(text.contains("(lasgn a@0 (arg 0))"));
    assert!(text.contains("(lasgn b@1 (arg 1))"));
    assert!(text.contains("(lasgn c@2 (optarg 2 3 1))"));
    assert!(text.contains("(lasgn r@3 (restarg 3 -0))"));
    assert!(!text.contains("arg-or-nil"));
}

#[test]
fn test_block_parameters_read_nil_and_destructure() {
    let text = render("[1].each { |a, b| a }");
    assert!(text.contains("(block (each-block)/2 [a b %destructure_1]"));
    assert!(text.contains("(destructure? (respond-to? (arg-or-nil 0) :to_ary))"));
    assert!(text.contains("(lasgn %destructure_1@2 (splat-nil (arg-or-nil 0)))"));
    assert!(text.contains("(lasgn a@0 (index %destructure_1@2 0))"));
    assert!(text.contains("(lasgn a@0 (arg-or-nil 0))"));
    assert!(text.contains("(lasgn b@1 (arg-or-nil 1))"));
}

#[test]
fn test_single_parameter_block_has_no_switch() {
    let text = render("[1].each { |a| a }");
    assert!(!text.contains("destructure?"));
    assert!(text.contains("(lasgn a@0 (arg-or-nil 0))"));
}

#[test]
fn test_for_variable_lives_in_enclosing_frame() {
    let (unit, _) = translate("for i in [1, 2] do i end");
    let graph = &unit.graph;
    let i = graph.intern("i");
    let (method, frame) = blocks(&unit)[0];
    assert_eq!(graph.method(method).name, "(for-block)");
    assert_eq!(graph.frame(unit.root_frame).slot_of(i), Some(0));
    assert_eq!(graph.frame(frame).slot_of(i), None);
    assert!(graph.frame(frame).captures(i));

    let text = graph.render(unit.root);
    assert!(text.contains("(call [1 2] each &(block (for-block)/1 [%for_1] ^[i]"));
    assert!(text.contains("(lasgn %for_1@0 (arg-or-nil 0))"));
    assert!(text.contains("(lasgn i@0^1 %for_1@0)"));
}

#[test]
fn test_parallel_assignment_uses_temps() {
    let text = render("a, b = 1, 2");
    assert!(text.contains(
        "(seq (lasgn %multi_1@2 1) (lasgn %multi_2@3 2) (lasgn a@0 %multi_1@2) (lasgn b@1 %multi_2@3) [%multi_1@2 %multi_2@3])"
    ));
}

#[test]
fn test_destructuring_assignment() {
    let text = render("pair = [1, 2]\na, *r, b = pair");
    assert!(text.contains("(lasgn %array_1@4 (splat-nil pair@0))"));
    assert!(text.contains("(lasgn a@1 (index %array_1@4 0))"));
    assert!(text.contains("(lasgn r@2 (slice %array_1@4 1 -1))"));
    assert!(text.contains("(if (size>= %array_1@4 2) (index %array_1@4 -1) (index %array_1@4 1))"));
}

#[test]
fn test_element_assignment_evaluates_operands_once() {
    let text = render("h = {}\nh[:k] += 1");
    assert!(text.contains("(lasgn %opelementassign_1@1 h@0)"));
    assert!(text.contains("(lasgn %index_2@2 :k)"));
    assert!(text.contains(
        "(call %opelementassign_1@1 []= %index_2@2 (call (call %opelementassign_1@1 [] %index_2@2) + 1))"
    ));
    assert_eq!(text.matches("(lasgn h@0").count(), 1);
}

#[test]
fn test_attribute_operator_assignment() {
    let text = render("o = 1\no.x ||= 2");
    assert!(text.contains(
        "(seq (lasgn %opassign_1@1 o@0) (or (call %opassign_1@1 x) (call %opassign_1@1 x= 2)))"
    ));
}

#[test]
fn test_flip_flop_state_is_reset_on_entry() {
    let text = render("def m\n  if a..b then 1 end\nend");
    assert!(text.contains("(init-flip %flipflop_1@0)"));
    assert!(text.contains("(flip2 %flipflop_1@0 (bool (fcall a)) (bool (fcall b)))"));
}

#[test]
fn test_unsupported_nodes_warn() {
    let (unit, sink) = translate("END { 1 }");
    assert_eq!(unit.graph.render(unit.root), "(catch-retry (catch-next (catch-return#1 nil)))");
    let warnings: Vec<_> = sink
        .with_id(DiagnosticId::UnsupportedNode)
        .map(|diagnostic| diagnostic.message.as_str())
        .collect();
    assert_eq!(warnings, vec!["PostExe does nothing - translating as nil"]);
}

#[test]
fn test_class_body_and_constants() {
    let text = render("class A < B\n  X = 1\n  def f\n    X\n  end\nend");
    assert!(text.contains("(define-class A (class-of self) (const (class-of self) B))"));
    assert!(text.contains("(def <class:A>/0 []"));
    assert!(text.contains("(cdecl self X 1)"));
    assert!(text.contains("(add-method self (def f/0 []"));
    assert!(text.contains("(const (class-of self) X)"));
}

#[test]
fn test_defined_is_static_for_locals() {
    let text = render("x = 1\ndefined?(x)");
    assert!(text.contains("\"local-variable\""));
    assert!(!text.contains("(defined"));
}

#[test]
fn test_named_captures_skip_reserved_words() {
    let (unit, _) = translate("s = \"ab\"\n/(?<end>a)(?<year>b)/ =~ s");
    let graph = &unit.graph;
    let frame = graph.frame(unit.root_frame);
    assert_eq!(frame.slot_of(graph.intern("end")), None);
    assert!(frame.slot_of(graph.intern("year")).is_some());

    let text = graph.render(unit.root);
    assert!(text.contains("(lasgn year@"));
    assert!(!text.contains("(lasgn end@"));
}

fn internal_error(result: Result<TranslatedRoot, crate::TranslateError>) -> InternalError {
    match result {
        Ok(_) => panic!("translated despite broken bookkeeping"),
        Err(error) => error.error,
    }
}

#[test]
fn test_return_id_overflow_is_internal() {
    let mut sink = DiagnosticSink::new("t.rb", FileId(0), false);
    let parsed = parse(b"def m\n  1\nend", &ParserConfig::default(), &mut sink).expect("parses");
    let mut translator = Translator::new(&mut sink, Interner::new());
    translator.next_return_id = u32::MAX;
    assert_eq!(
        internal_error(translator.translate_root(&parsed)),
        InternalError::ReturnIdOverflow
    );
}

#[test]
fn test_leaving_the_wrong_environment_is_internal() {
    let mut sink = DiagnosticSink::new("t.rb", FileId(0), false);
    let mut translator = Translator::new(&mut sink, Interner::new());
    let root = translator.envs.current();
    let outer = translator.envs.push(translator.envs.current_env().clone());
    translator.envs.push(translator.envs.current_env().clone());

    let error = translator.leave_environment(outer, Position::default()).expect_err("unbalanced");
    assert_eq!(error.error, InternalError::UnbalancedEnvironment);

    translator.envs.pop();
    translator.leave_environment(outer, Position::default()).expect("balanced");
    assert_eq!(translator.envs.current(), root);
    let error = translator.leave_environment(root, Position::default()).expect_err("no parent");
    assert_eq!(error.error, InternalError::UnbalancedEnvironment);
}

#[test]
fn test_assignment_without_owner_is_internal() {
    let mut sink = DiagnosticSink::new("t.rb", FileId(0), false);
    let mut translator = Translator::new(&mut sink, Interner::new());
    let root = translator.envs.current();
    let env = translator.envs.get_mut(root);
    env.own_scope_for_assignments = false;
    env.never_assign_in_parent = false;

    let error = translator.local_assignment_slot("x", Position::default()).expect_err("no owner");
    assert_eq!(error.error, InternalError::NoScopeOwner { name: "x".to_string() });
}

#[test]
fn test_owner_behind_a_method_barrier_is_internal() {
    let mut sink = DiagnosticSink::new("t.rb", FileId(0), false);
    let mut translator = Translator::new(&mut sink, Interner::new());
    let mut inner = translator.envs.current_env().clone();
    inner.frame = translator
        .graph
        .add_frame(FrameDescriptor::new(Specializer::Method.frame_kind(), None));
    inner.specializer = Specializer::Method;
    inner.own_scope_for_assignments = false;
    inner.never_assign_in_parent = false;
    translator.envs.push(inner);

    let error = translator.local_assignment_slot("x", Position::default()).expect_err("unreachable slot");
    assert_eq!(error.error, InternalError::UnresolvedSlot { name: "x".to_string() });
}

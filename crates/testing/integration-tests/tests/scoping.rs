//! Local variable resolution across methods, blocks and loops

use gt_exec::visitor::descendants;
use gt_exec::{ExecKind, FrameId};
use integration_tests::{Value, run, translate};

/// Frames of every block in the unit, outermost first
fn block_frames(unit: &gt_driver::ExecUnit) -> Vec<FrameId> {
    descendants(&unit.graph, unit.root)
        .into_iter()
        .filter_map(|id| match unit.graph[id].kind {
            ExecKind::BlockDefinition { frame, .. } => Some(frame),
            _ => None,
        })
        .collect()
}

#[test]
fn test_block_captures_method_local() {
    let source = "def m\n  x = 1\n  [1, 2].each { |i| x = x + i }\n  x\nend\nr = m";
    let unit = translate(source).expect("translates");
    let x = unit.graph.intern("x");
    let frames = block_frames(&unit);
    assert_eq!(frames.len(), 1);
    let block = unit.graph.frame(frames[0]);
    assert!(block.captures(x));
    assert_eq!(block.slot_of(x), None);

    let outcome = integration_tests::execute(&unit);
    assert_eq!(outcome.local("r"), Value::Int(4));
}

#[test]
fn test_nested_blocks_reach_the_method_frame() {
    let source = "def m\n  x = 0\n  [1, 2].each { |a| [10].each { |b| x = x + a + b } }\n  x\nend\nr = m";
    let unit = translate(source).expect("translates");
    let x = unit.graph.intern("x");
    for frame in block_frames(&unit) {
        assert_eq!(unit.graph.frame(frame).slot_of(x), None);
    }

    let depths: Vec<u32> = descendants(&unit.graph, unit.root)
        .into_iter()
        .filter_map(|id| match unit.graph[id].kind {
            ExecKind::ReadLocal(slot) if slot.name == x => Some(slot.depth),
            _ => None,
        })
        .collect();
    assert!(depths.contains(&2));
    assert!(depths.contains(&0));

    let outcome = integration_tests::execute(&unit);
    assert_eq!(outcome.local("r"), Value::Int(23));
}

#[test]
fn test_block_locals_do_not_leak() {
    let outcome = run("[1, 2].each { |y| z = y }\nw = 1").expect("translates");
    assert!(outcome.value().is_ok());
    assert!(!outcome.locals.contains_key("z"));
    assert!(!outcome.locals.contains_key("y"));
    assert_eq!(outcome.local("w"), Value::Int(1));
}

#[test]
fn test_each_call_gets_a_fresh_block_frame() {
    let source = "seen = []\n[1, 2].each { |i| if i == 1 then k = :set end\n seen.push(k) }";
    let outcome = run(source).expect("translates");
    assert_eq!(
        outcome.local("seen"),
        Value::array(vec![Value::sym("set"), Value::Nil])
    );
}

#[test]
fn test_for_loop_variable_outlives_the_loop() {
    let outcome = run("total = 0\nfor i in [1, 2, 3] do total += i end").expect("translates");
    assert!(outcome.value().is_ok());
    assert_eq!(outcome.local("i"), Value::Int(3));
    assert_eq!(outcome.local("total"), Value::Int(6));
}

#[test]
fn test_for_loop_in_class_body_uses_class_variables_of_the_class() {
    let unit = translate("class A\n  for i in [1, 2] do @@last = i end\n  [1].each { @@other = 1 }\nend")
        .expect("translates");
    let text = unit.render();
    assert!(text.contains("(cvasgn self @@last"));
    assert!(text.contains("(cvasgn (class-of self) @@other"));
}

#[test]
fn test_method_body_does_not_see_top_level_locals() {
    let outcome = run("x = 5\ndef m\n  defined?(x)\nend\nr = m").expect("translates");
    assert_eq!(outcome.local("x"), Value::Int(5));
    assert_eq!(outcome.local("r"), Value::Nil);
}

//! Translation is a pure function of its input

use expect_test::expect;
use gt_driver::{TranslateConfig, translate_file};
use integration_tests::translate;
use std::io::Write;

const PROGRAM: &str = "\
class Counter
  def initialize(start = 0)
    @count = start
  end

  def bump(by: 1)
    @count += by
  end
end

total = 0
[1, 2, 3].each_with_index do |a, i|
  total += i if (i == 1)..(i == 2)
end
case total
when 0 then :none
when 1..3 then :few
else :many
end
";

#[test]
fn test_translating_twice_gives_the_same_graph() {
    let first = translate(PROGRAM).expect("translates");
    let second = translate(PROGRAM).expect("translates");
    assert_eq!(first.render(), second.render());
    assert_eq!(first.graph.len(), second.graph.len());
    assert_eq!(first.graph.frames().count(), second.graph.frames().count());
    assert_eq!(first.graph.methods().count(), second.graph.methods().count());
}

#[test]
fn test_return_ids_restart_per_unit() {
    let first = translate("def m\n  1\nend").expect("translates");
    let second = translate("x = 1").expect("translates");
    assert!(first.render().contains("catch-return#1"));
    assert!(second.render().contains("catch-return#1"));
    assert!(!second.render().contains("catch-return#0"));
}

#[test]
fn test_file_and_source_agree() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(PROGRAM.as_bytes()).expect("written");

    let from_file = translate_file(file.path(), &TranslateConfig::default()).expect("translates");
    let from_source = translate(PROGRAM).expect("translates");
    assert_eq!(from_file.render(), from_source.render());
}

#[test]
fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let error = translate_file(dir.path().join("absent.rb"), &TranslateConfig::default()).expect_err("missing");
    assert!(matches!(error, gt_driver::CompileError::Io { .. }));
}

#[test]
fn test_small_program_snapshot() {
    let unit = translate("a = 1\nb = a").expect("translates");
    expect![[r#"(catch-retry (catch-next (catch-return#1 (seq (lasgn a@0 1) (lasgn b@1 a@0)))))"#]]
        .assert_eq(&unit.render());
}

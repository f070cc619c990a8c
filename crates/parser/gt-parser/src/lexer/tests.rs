use super::*;

struct Locals(&'static [&'static str]);

impl LocalLookup for Locals {
    fn is_local(&self, name: &str) -> bool {
        self.0.contains(&name)
    }
}

fn lex_with(source: &str, locals: &[&'static str]) -> Vec<TokenKind> {
    let locals = Locals(Box::leak(locals.to_vec().into_boxed_slice()));
    let mut lexer = Lexer::new(source.as_bytes(), 1, true);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token(&locals).expect("lexes");
        if token.kind == TokenKind::Eof {
            return tokens;
        }
        tokens.push(token.kind);
    }
}

fn lex(source: &str) -> Vec<TokenKind> {
    lex_with(source, &[])
}

fn lex_error(source: &str) -> String {
    let mut lexer = Lexer::new(source.as_bytes(), 1, true);
    loop {
        match lexer.next_token(&Locals(&[])) {
            Ok(token) if token.kind == TokenKind::Eof => panic!("expected a lex error"),
            Ok(_) => {}
            Err(error) => return error.to_string(),
        }
    }
}

fn content(text: &str) -> TokenKind {
    TokenKind::StringContent(text.as_bytes().to_vec())
}

#[test]
fn test_minus_disambiguation() {
    assert_eq!(
        lex("a - 1"),
        vec![TokenKind::Ident("a".into()), TokenKind::Minus, TokenKind::Integer(1)]
    );
    assert_eq!(
        lex_with("a -1", &["a"]),
        vec![TokenKind::Ident("a".into()), TokenKind::Minus, TokenKind::Integer(1)]
    );
    assert_eq!(
        lex("foo -1"),
        vec![TokenKind::Ident("foo".into()), TokenKind::UMinusNum, TokenKind::Integer(1)]
    );
    assert_eq!(lex("-x"), vec![TokenKind::UMinus, TokenKind::Ident("x".into())]);
}

#[test]
fn test_regexp_versus_division() {
    assert_eq!(
        lex_with("a / 2", &["a"]),
        vec![TokenKind::Ident("a".into()), TokenKind::Slash, TokenKind::Integer(2)]
    );
    assert_eq!(
        lex("x = /ab+/i"),
        vec![
            TokenKind::Ident("x".into()),
            TokenKind::Assign,
            TokenKind::StringBeg(StringKind::Regexp),
            content("ab+"),
            TokenKind::RegexpEnd(RegexpOptionsExt::with("i")),
        ]
    );
}

struct RegexpOptionsExt;

impl RegexpOptionsExt {
    fn with(flags: &str) -> gt_syntax::RegexpOptions {
        flags
            .chars()
            .try_fold(gt_syntax::RegexpOptions::default(), |options, flag| options.with_flag(flag))
            .expect("known flags")
    }
}

#[test]
fn test_unknown_regexp_option() {
    assert_eq!(lex_error("/a/q"), "unknown regexp option - q");
}

#[test]
fn test_double_quoted_escapes_and_interpolation() {
    assert_eq!(
        lex(r#""a\tb#{x}é""#),
        vec![
            TokenKind::StringBeg(StringKind::Plain),
            content("a\tb"),
            TokenKind::StringDBeg,
            TokenKind::Ident("x".into()),
            TokenKind::StringDEnd,
            content("é"),
            TokenKind::StringEnd,
        ]
    );
}

#[test]
fn test_single_quotes_keep_most_backslashes() {
    assert_eq!(
        lex(r"'a\nb\'c\\'"),
        vec![
            TokenKind::StringBeg(StringKind::Plain),
            content(r"a\nb'c\"),
            TokenKind::StringEnd,
        ]
    );
}

#[test]
fn test_interpolated_instance_variable() {
    assert_eq!(
        lex(r#""v=#@value""#),
        vec![
            TokenKind::StringBeg(StringKind::Plain),
            content("v="),
            TokenKind::StringDVar,
            TokenKind::IVar("@value".into()),
            TokenKind::StringEnd,
        ]
    );
}

#[test]
fn test_nested_braces_inside_interpolation() {
    assert_eq!(
        lex(r##""#{ {a: 1} }""##),
        vec![
            TokenKind::StringBeg(StringKind::Plain),
            TokenKind::StringDBeg,
            TokenKind::LBrace,
            TokenKind::Label("a".into()),
            TokenKind::Integer(1),
            TokenKind::RBrace,
            TokenKind::StringDEnd,
            TokenKind::StringEnd,
        ]
    );
}

#[test]
fn test_percent_words() {
    assert_eq!(
        lex("%w( a  b\\ c )"),
        vec![
            TokenKind::StringBeg(StringKind::Words),
            content("a"),
            TokenKind::WordSep,
            content("b c"),
            TokenKind::StringEnd,
        ]
    );
    assert_eq!(lex_error("%z(a)"), "unknown type of %string");
}

#[test]
fn test_percent_literal_nesting() {
    assert_eq!(
        lex("%q(a (b) c)"),
        vec![
            TokenKind::StringBeg(StringKind::Plain),
            content("a (b) c"),
            TokenKind::StringEnd,
        ]
    );
}

#[test]
fn test_heredoc_resumes_after_identifier() {
    let tokens = lex("foo(<<EOS, 1)\nline one\nEOS\nbar");
    assert_eq!(
        tokens,
        vec![
            TokenKind::Ident("foo".into()),
            TokenKind::LParenCall,
            TokenKind::StringBeg(StringKind::Plain),
            content("line one\n"),
            TokenKind::StringEnd,
            TokenKind::Comma,
            TokenKind::Integer(1),
            TokenKind::RParen,
            TokenKind::NewLine,
            TokenKind::Ident("bar".into()),
        ]
    );
}

#[test]
fn test_two_heredocs_on_one_line() {
    let tokens = lex("foo(<<A, <<B)\none\nA\ntwo\nB\nbar");
    assert_eq!(
        tokens,
        vec![
            TokenKind::Ident("foo".into()),
            TokenKind::LParenCall,
            TokenKind::StringBeg(StringKind::Plain),
            content("one\n"),
            TokenKind::StringEnd,
            TokenKind::Comma,
            TokenKind::StringBeg(StringKind::Plain),
            content("two\n"),
            TokenKind::StringEnd,
            TokenKind::RParen,
            TokenKind::NewLine,
            TokenKind::Ident("bar".into()),
        ]
    );
}

#[test]
fn test_invalid_digit_names_the_radix() {
    assert_eq!(lex_error("0b102"), "Invalid binary digit `2'");
    assert_eq!(lex_error("0o19"), "Invalid octal digit `9'");
    assert_eq!(lex_error("0779"), "Invalid octal digit `9'");
}

#[test]
fn test_squiggly_heredoc_dedents() {
    let tokens = lex("x = <<~EOS\n    a\n      b\n    EOS\n");
    assert_eq!(
        tokens,
        vec![
            TokenKind::Ident("x".into()),
            TokenKind::Assign,
            TokenKind::StringBeg(StringKind::Plain),
            content("a\n  b\n"),
            TokenKind::StringEnd,
            TokenKind::NewLine,
        ]
    );
}

#[test]
fn test_unterminated_heredoc() {
    assert_eq!(
        lex_error("x = <<EOS\nabc\n"),
        "can't find string \"EOS\" anywhere before EOF"
    );
}

#[test]
fn test_labels_and_ternary_colons() {
    assert_eq!(
        lex("foo(key: 1)"),
        vec![
            TokenKind::Ident("foo".into()),
            TokenKind::LParenCall,
            TokenKind::Label("key".into()),
            TokenKind::Integer(1),
            TokenKind::RParen,
        ]
    );
    assert_eq!(
        lex_with("c ? a : b", &["c", "a", "b"]),
        vec![
            TokenKind::Ident("c".into()),
            TokenKind::Question,
            TokenKind::Ident("a".into()),
            TokenKind::Colon,
            TokenKind::Ident("b".into()),
        ]
    );
}

#[test]
fn test_modifier_keywords() {
    assert_eq!(
        lex("x if y"),
        vec![
            TokenKind::Ident("x".into()),
            TokenKind::Keyword(Keyword::IfMod),
            TokenKind::Ident("y".into()),
        ]
    );
    assert_eq!(
        lex("if y then end"),
        vec![
            TokenKind::Keyword(Keyword::If),
            TokenKind::Ident("y".into()),
            TokenKind::Keyword(Keyword::Then),
            TokenKind::Keyword(Keyword::End),
        ]
    );
}

#[test]
fn test_setter_name_after_def() {
    assert_eq!(
        lex("def value=(v)"),
        vec![
            TokenKind::Keyword(Keyword::Def),
            TokenKind::Ident("value=".into()),
            TokenKind::LParenCall,
            TokenKind::Ident("v".into()),
            TokenKind::RParen,
        ]
    );
}

#[test]
fn test_newline_skipped_before_leading_dot() {
    assert_eq!(
        lex("a\n  .b"),
        vec![
            TokenKind::Ident("a".into()),
            TokenKind::Dot,
            TokenKind::Ident("b".into()),
        ]
    );
}

#[test]
fn test_globals_and_back_references() {
    assert_eq!(
        lex("$foo; $1; $&; $~"),
        vec![
            TokenKind::GVar("$foo".into()),
            TokenKind::Semi,
            TokenKind::NthRef(1),
            TokenKind::Semi,
            TokenKind::BackRef('&'),
            TokenKind::Semi,
            TokenKind::GVar("$~".into()),
        ]
    );
}

#[test]
fn test_data_segment_after_end_marker() {
    let source = b"p 1\n__END__\nraw data\n";
    let mut lexer = Lexer::new(source, 1, true);
    let locals = Locals(&[]);
    let mut kinds = Vec::new();
    loop {
        let token = lexer.next_token(&locals).expect("lexes");
        if token.kind == TokenKind::Eof {
            break;
        }
        kinds.push(token.kind);
    }
    assert_eq!(kinds.len(), 3);
    let start = lexer.data_start().expect("data segment");
    assert_eq!(&source[start..], b"raw data\n");
}

#[test]
fn test_embedded_documents_are_skipped() {
    assert_eq!(
        lex("=begin\nignored\n=end\nx"),
        vec![TokenKind::Ident("x".into())]
    );
}

#[test]
fn test_character_literal() {
    assert_eq!(lex("?a"), vec![TokenKind::Char(b"a".to_vec())]);
    assert_eq!(lex("?\\n"), vec![TokenKind::Char(b"\n".to_vec())]);
}

#[test]
fn test_invalid_utf8_in_string() {
    let mut lexer = Lexer::new(b"\"\xff\"", 1, true);
    let locals = Locals(&[]);
    assert!(lexer.next_token(&locals).is_ok());
    let error = lexer.next_token(&locals).expect_err("invalid byte");
    assert_eq!(error.to_string(), "invalid multibyte char (UTF-8)");
}

#[test]
fn test_ambiguous_argument_warning_only_in_argument_position() {
    let mut lexer = Lexer::new(b"foo *args", 1, true);
    let locals = Locals(&[]);
    let first = lexer.next_token(&locals).expect("ident");
    assert_eq!(first.kind, TokenKind::Ident("foo".into()));
    let star = lexer.next_token(&locals).expect("splat");
    assert_eq!(star.kind, TokenKind::Splat);
    let warnings = lexer.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].verbose);
}

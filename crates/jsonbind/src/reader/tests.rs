use rstest::rstest;

use super::*;
use crate::{error::ErrorKind, tests::tokens, value::Value};

fn lenient(input: &str) -> JsonStreamReader<'_> {
    let options = ReaderOptions {
        lenient: true,
        ..ReaderOptions::default()
    };
    JsonStreamReader::with_options(input, options)
}

/// Runs `check` over a stream reader and over a tree reader for `json`.
fn with_both_readers(json: &str, check: impl Fn(&mut dyn JsonReader)) {
    let mut stream = JsonStreamReader::new(json);
    check(&mut stream);
    let tree = Value::parse(json).unwrap();
    let mut reader = JsonTreeReader::new(&tree);
    check(&mut reader);
}

fn kind_of<T: core::fmt::Debug>(result: Result<T>) -> ErrorKind {
    result.unwrap_err().kind().clone()
}

#[rstest]
#[case::scalars(r#"[1, -2.5, "x", true, false, null]"#)]
#[case::nested(r#"{"a": [1, {"b": null}], "c": {"d": []}, "e": "x"}"#)]
#[case::empty_object("{}")]
#[case::top_level_string(r#""alone""#)]
#[case::escapes(r#"["tab\tquote\"slash\/", "é😀"]"#)]
fn tree_and_stream_agree(#[case] json: &str) {
    let streamed = tokens(&mut JsonStreamReader::new(json));
    let tree = Value::parse(json).unwrap();
    let walked = tokens(&mut JsonTreeReader::new(&tree));
    assert_eq!(streamed, walked);
}

#[test]
fn peek_is_idempotent() {
    with_both_readers(r#"{"a": 1}"#, |reader| {
        for _ in 0..3 {
            assert_eq!(reader.peek().unwrap(), JsonToken::BeginObject);
        }
        reader.begin_object().unwrap();
        for _ in 0..3 {
            assert_eq!(reader.peek().unwrap(), JsonToken::Name);
        }
        assert_eq!(reader.next_name().unwrap(), "a");
        assert_eq!(reader.peek().unwrap(), JsonToken::Number);
        assert_eq!(reader.peek().unwrap(), JsonToken::Number);
        assert_eq!(reader.next_i64().unwrap(), 1);
        reader.end_object().unwrap();
        assert_eq!(reader.peek().unwrap(), JsonToken::EndDocument);
    });
}

#[test]
fn integral_requests_do_not_truncate() {
    with_both_readers("[1.5, 2.0, 1e2, 3000000000]", |reader| {
        reader.begin_array().unwrap();

        assert!(matches!(kind_of(reader.next_i32()), ErrorKind::NumberFormat(_)));
        assert!(matches!(kind_of(reader.next_i64()), ErrorKind::NumberFormat(_)));
        assert!((reader.next_f64().unwrap() - 1.5).abs() < f64::EPSILON);

        assert_eq!(reader.next_i32().unwrap(), 2);
        assert_eq!(reader.next_i64().unwrap(), 100);

        assert!(matches!(kind_of(reader.next_i32()), ErrorKind::NumberFormat(_)));
        assert_eq!(reader.next_i64().unwrap(), 3_000_000_000);
        reader.end_array().unwrap();
    });
}

#[test]
fn numbers_from_strings() {
    with_both_readers(r#"["12", "x", 42]"#, |reader| {
        reader.begin_array().unwrap();
        assert_eq!(reader.next_i64().unwrap(), 12);
        assert!(matches!(kind_of(reader.next_i32()), ErrorKind::NumberFormat(_)));
        assert_eq!(reader.next_string().unwrap(), "x");
        assert_eq!(reader.next_string().unwrap(), "42");
        reader.end_array().unwrap();
    });
}

#[test]
fn failed_calls_do_not_advance() {
    with_both_readers(r#"["text"]"#, |reader| {
        reader.begin_array().unwrap();
        assert!(matches!(kind_of(reader.next_bool()), ErrorKind::Structural(_)));
        assert!(matches!(kind_of(reader.next_null()), ErrorKind::Structural(_)));
        assert!(matches!(kind_of(reader.begin_object()), ErrorKind::Structural(_)));
        assert!(matches!(kind_of(reader.next_name()), ErrorKind::Structural(_)));
        assert_eq!(reader.next_string().unwrap(), "text");
        reader.end_array().unwrap();
    });
}

#[rstest]
#[case::end_object_in_array("[1]", false)]
#[case::end_array_with_content("[1, 2]", true)]
fn closing_requires_a_matching_empty_container(#[case] json: &str, #[case] close_array: bool) {
    with_both_readers(json, |reader| {
        reader.begin_array().unwrap();
        let result = if close_array {
            reader.end_array()
        } else {
            reader.end_object()
        };
        assert!(matches!(kind_of(result), ErrorKind::Structural(_)));
    });
}

#[test]
fn skip_value_skips_nested_structures() {
    with_both_readers(r#"{"a": {"b": [1, {"c": null}]}, "d": true}"#, |reader| {
        reader.begin_object().unwrap();
        assert_eq!(reader.next_name().unwrap(), "a");
        reader.skip_value().unwrap();
        assert!(reader.has_next().unwrap());
        assert_eq!(reader.next_name().unwrap(), "d");
        assert!(reader.next_bool().unwrap());
        assert!(!reader.has_next().unwrap());
        reader.end_object().unwrap();
    });
}

#[rstest]
#[case::skip_value("[[1, 2}, 3]", false)]
#[case::next_value(r#"[{"a":[1}, 3]"#, true)]
fn failed_multi_token_calls_do_not_advance(#[case] json: &str, #[case] capture: bool) {
    let mut reader = JsonStreamReader::new(json);
    reader.begin_array().unwrap();
    let token = reader.peek().unwrap();
    let location = reader.location();

    let err = if capture {
        reader.next_value().map(drop)
    } else {
        reader.skip_value()
    }
    .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Structural(_)), "{err}");

    assert_eq!(reader.peek().unwrap(), token);
    assert_eq!(reader.location(), location);
    assert_eq!(reader.skip_value().unwrap_err(), err);
}

#[test]
fn skip_value_at_end_of_container_fails() {
    with_both_readers("[]", |reader| {
        reader.begin_array().unwrap();
        assert!(matches!(kind_of(reader.skip_value()), ErrorKind::Structural(_)));
        reader.end_array().unwrap();
    });
}

#[test]
fn next_value_returns_source_text() {
    let mut reader = JsonStreamReader::new(r#"{"a": [1, {"b": "x"}], "c": 1.50, "d": null}"#);
    reader.begin_object().unwrap();
    reader.next_name().unwrap();
    assert_eq!(reader.next_value().unwrap(), r#"[1, {"b": "x"}]"#);
    reader.next_name().unwrap();
    assert_eq!(reader.next_value().unwrap(), "1.50");
    reader.next_name().unwrap();
    assert_eq!(reader.next_value().unwrap(), "null");
    reader.end_object().unwrap();
}

#[test]
fn tree_next_value_is_compact() {
    let tree = Value::parse(r#"{"a": [1, {"b": "x"}]}"#).unwrap();
    let mut reader = JsonTreeReader::new(&tree);
    reader.begin_object().unwrap();
    reader.next_name().unwrap();
    assert_eq!(reader.next_value().unwrap(), r#"[1,{"b":"x"}]"#);
    reader.end_object().unwrap();
}

#[test]
fn numbers_read_as_strings() {
    let mut stream = JsonStreamReader::new("[1.50]");
    stream.begin_array().unwrap();
    assert_eq!(stream.next_string().unwrap(), "1.50");

    // a tree keeps the number, not its text
    let tree = Value::parse("[1.50]").unwrap();
    let mut reader = JsonTreeReader::new(&tree);
    reader.begin_array().unwrap();
    assert_eq!(reader.next_string().unwrap(), "1.5");
}

#[test]
fn tree_non_finite_numbers_are_lenient_only() {
    let tree = Value::Array(vec![
        Value::Array(vec![Value::from(f64::INFINITY)]),
        Value::from(f64::NAN),
    ]);
    let mut strict = JsonTreeReader::new(&tree);
    strict.begin_array().unwrap();
    assert!(matches!(kind_of(strict.next_value()), ErrorKind::NumberFormat(_)));
    assert_eq!(strict.peek().unwrap(), JsonToken::BeginArray);
    strict.skip_value().unwrap();
    assert!(matches!(kind_of(strict.next_f64()), ErrorKind::NumberFormat(_)));

    let options = ReaderOptions {
        lenient: true,
        ..ReaderOptions::default()
    };
    let mut reader = JsonTreeReader::with_options(&tree, options);
    reader.begin_array().unwrap();
    let raw = reader.next_value().unwrap();
    assert_eq!(raw, "[Infinity]");
    assert_eq!(tokens(&mut lenient(&raw)), ["[", "number inf", "]"]);
    assert!(reader.next_f64().unwrap().is_nan());
}

#[test]
fn next_value_text_parses_on_its_own() {
    let mut reader = JsonStreamReader::new(r#"[{"k": ["é", 2e3]}]"#);
    reader.begin_array().unwrap();
    let raw = reader.next_value().unwrap();
    let mut replay = JsonStreamReader::new(&raw);
    assert_eq!(
        tokens(&mut replay),
        ["{", "name k", "[", "string é", "number 2000", "]", "}"]
    );
}

#[test]
fn closed_readers_reject_everything() {
    with_both_readers("[1]", |reader| {
        reader.close();
        reader.close();
        assert!(matches!(kind_of(reader.peek()), ErrorKind::IllegalUse(_)));
        assert!(matches!(kind_of(reader.begin_array()), ErrorKind::IllegalUse(_)));
    });
}

// ---- Nesting ----

#[test]
fn nesting_is_limited() {
    let options = ReaderOptions {
        max_depth: 3,
        ..ReaderOptions::default()
    };
    let json = "[[[[1]]]]";
    let tree = Value::parse(json).unwrap();
    let mut stream = JsonStreamReader::with_options(json, options);
    let mut walker = JsonTreeReader::with_options(&tree, options);
    let readers: [&mut dyn JsonReader; 2] = [&mut stream, &mut walker];
    for reader in readers {
        for _ in 0..3 {
            reader.begin_array().unwrap();
        }
        assert!(matches!(kind_of(reader.begin_array()), ErrorKind::Structural(_)));
        assert_eq!(reader.peek().unwrap(), JsonToken::BeginArray);
    }

    let mut reader = JsonStreamReader::with_options("[[[1]]]", options);
    assert_eq!(tokens(&mut reader).len(), 7);
}

#[test]
fn deep_documents_fail_instead_of_overflowing() {
    let depth = ReaderOptions::DEFAULT_MAX_DEPTH;
    let at_limit = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
    assert!(Value::parse(&at_limit).is_ok());

    let deep = format!("{}{}", "[".repeat(20_000), "]".repeat(20_000));
    let err = Value::parse(&deep).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Structural(_)));
    assert_eq!(err.location(), Some(Location { line: 1, column: depth + 1 }));

    let mut reader = JsonStreamReader::new(&deep);
    assert!(matches!(kind_of(reader.skip_value()), ErrorKind::Structural(_)));
    assert_eq!(reader.peek().unwrap(), JsonToken::BeginArray);
}

// ---- Strict vs lenient ----

#[rstest]
#[case::unquoted_name("{a:true}")]
#[case::single_quotes("{'a':'b'}")]
#[case::line_comment("// note\n[1]")]
#[case::hash_comment("# note\n[1]")]
#[case::block_comment("[/* x */ 1]")]
#[case::equals_separator(r#"{"a"=1}"#)]
#[case::arrow_separator(r#"{"a"=>1}"#)]
#[case::semicolon(r#"{"a":1;"b":2}"#)]
#[case::trailing_comma_in_object(r#"{"a":1,}"#)]
#[case::omitted_array_element("[1,]")]
#[case::unquoted_string("[abc]")]
#[case::non_finite("[NaN, -Infinity]")]
#[case::upper_case_literal("[TRUE]")]
#[case::two_top_level_values("1 2")]
#[case::non_execute_prefix(")]}'\n[1]")]
fn lenient_only_syntax(#[case] json: &str) {
    let mut strict = JsonStreamReader::new(json);
    let err = (|| -> Result<()> {
        while strict.peek()? != JsonToken::EndDocument {
            match strict.peek()? {
                JsonToken::BeginArray => strict.begin_array()?,
                JsonToken::EndArray => strict.end_array()?,
                JsonToken::BeginObject => strict.begin_object()?,
                JsonToken::EndObject => strict.end_object()?,
                JsonToken::Name => {
                    strict.next_name()?;
                }
                _ => strict.skip_value()?,
            }
        }
        Ok(())
    })()
    .unwrap_err();
    assert!(
        matches!(err.kind(), ErrorKind::Structural(_)),
        "{json}: {err:?}"
    );
    assert!(err.location().is_some());

    let lenient_tokens = tokens(&mut lenient(json));
    assert!(!lenient_tokens.is_empty());
}

#[test]
fn unquoted_name_in_lenient_mode() {
    let mut reader = lenient("{a:true}");
    reader.begin_object().unwrap();
    assert_eq!(reader.next_name().unwrap(), "a");
    assert!(reader.next_bool().unwrap());
    reader.end_object().unwrap();
    assert_eq!(reader.peek().unwrap(), JsonToken::EndDocument);
}

#[test]
fn omitted_array_elements_read_as_null() {
    assert_eq!(tokens(&mut lenient("[1,]")), ["[", "number 1", "null", "]"]);
    assert_eq!(
        tokens(&mut lenient("[,2]")),
        ["[", "null", "number 2", "]"]
    );
}

#[test]
fn lenient_separators_and_comments() {
    assert_eq!(
        tokens(&mut lenient("{'a' => 1; b = 'two', # c\n 'd': [/* */]}")),
        [
            "{",
            "name a",
            "number 1",
            "name b",
            "string two",
            "name d",
            "[",
            "]",
            "}"
        ]
    );
}

#[test]
fn non_finite_numbers() {
    let mut reader = lenient(r#"[NaN, -Infinity, "Infinity", nan]"#);
    reader.begin_array().unwrap();
    assert!(reader.next_f64().unwrap().is_nan());
    assert_eq!(reader.next_f64().unwrap(), f64::NEG_INFINITY);
    assert_eq!(reader.next_f64().unwrap(), f64::INFINITY);
    // only the JSON spellings are numbers
    assert!(matches!(kind_of(reader.next_f64()), ErrorKind::NumberFormat(_)));
    assert_eq!(reader.next_string().unwrap(), "nan");
    reader.end_array().unwrap();

    let mut strict = JsonStreamReader::new(r#"["NaN"]"#);
    strict.begin_array().unwrap();
    assert!(matches!(kind_of(strict.next_f64()), ErrorKind::NumberFormat(_)));
    assert_eq!(strict.next_string().unwrap(), "NaN");
}

#[test]
fn lenient_keywords_ignore_case() {
    assert_eq!(
        tokens(&mut lenient("[TRUE, False, NULL]")),
        ["[", "bool true", "bool false", "null", "]"]
    );
}

#[test]
fn lenient_top_level_values() {
    assert_eq!(
        tokens(&mut lenient("1 [2] {}")),
        ["number 1", "[", "number 2", "]", "{", "}"]
    );
}

#[test]
fn non_execute_prefix() {
    assert_eq!(
        tokens(&mut lenient(")]}'\n{\"a\": 1}")),
        ["{", "name a", "number 1", "}"]
    );
}

#[test]
fn strict_accepts_top_level_scalars_and_bom() {
    assert_eq!(tokens(&mut JsonStreamReader::new("\u{feff}\"x\"")), ["string x"]);
    assert_eq!(tokens(&mut JsonStreamReader::new(" 7 ")), ["number 7"]);
}

// ---- Strings ----

#[test]
fn unicode_escapes() {
    let mut reader = JsonStreamReader::new(r#""\u00e9\ud83d\ude00\n""#);
    assert_eq!(reader.next_string().unwrap(), "é😀\n");
}

#[test]
fn lone_surrogates() {
    let mut strict = JsonStreamReader::new(r#""\ud83d""#);
    assert!(matches!(kind_of(strict.next_string()), ErrorKind::Structural(_)));

    let mut reader = lenient(r#""a\ud83db""#);
    assert_eq!(reader.next_string().unwrap(), "a\u{fffd}b");
}

#[test]
fn raw_control_characters() {
    let mut strict = JsonStreamReader::new("\"a\tb\"");
    assert!(matches!(kind_of(strict.next_string()), ErrorKind::Structural(_)));

    let mut reader = lenient("\"a\tb\"");
    assert_eq!(reader.next_string().unwrap(), "a\tb");
}

#[test]
fn single_quote_escape_is_lenient_only() {
    let mut strict = JsonStreamReader::new(r#""it\'s""#);
    assert!(matches!(kind_of(strict.next_string()), ErrorKind::Structural(_)));

    let mut reader = lenient(r"'it\'s'");
    assert_eq!(reader.next_string().unwrap(), "it's");
}

// ---- Locations ----

#[test]
fn errors_carry_line_and_column() {
    let mut reader = JsonStreamReader::new("[1,\n  2,\n  x]");
    reader.begin_array().unwrap();
    reader.next_i32().unwrap();
    reader.next_i32().unwrap();
    let err = reader.peek().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Structural(_)));
    assert_eq!(err.location(), Some(Location { line: 3, column: 3 }));
}

#[test]
fn premature_end_of_input() {
    let mut reader = JsonStreamReader::new(r#"{"a":"#);
    reader.begin_object().unwrap();
    reader.next_name().unwrap();
    let err = reader.peek().unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::Structural("End of input".into()));
}

#[test]
fn mismatch_messages_name_both_tokens() {
    let mut reader = JsonStreamReader::new("[true]");
    reader.begin_array().unwrap();
    let err = reader.next_string().unwrap_err();
    assert_eq!(err.to_string(), "Expected STRING but was BOOLEAN at 1:2");
}

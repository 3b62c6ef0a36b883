#![no_main]
use arbitrary::Arbitrary;
use jsonbind::{ReaderOptions, Value};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    lenient: bool,
    text: String,
}

fuzz_target!(|input: Input| {
    let options = ReaderOptions {
        lenient: input.lenient,
        ..ReaderOptions::default()
    };
    let parsed = Value::parse_with(&input.text, options);

    if !input.lenient {
        // Anything serde_json accepts is valid JSON, so the strict reader must accept it too.
        if serde_json::from_str::<serde_json::Value>(&input.text).is_ok() {
            assert!(parsed.is_ok(), "rejected valid JSON {:?}: {:?}", input.text, parsed);
        }
    }

    // Whatever was read writes back as strict JSON that reads to the same tree.
    if let Ok(value) = parsed {
        if !has_non_finite(&value) {
            let text = value.to_string();
            let reparsed = Value::parse(&text)
                .unwrap_or_else(|err| panic!("wrote unreadable JSON {text:?}: {err}"));
            assert_eq!(reparsed, value);
            serde_json::from_str::<serde_json::Value>(&text)
                .unwrap_or_else(|err| panic!("serde_json rejected {text:?}: {err}"));
        }
    }
});

fn has_non_finite(value: &Value) -> bool {
    match value {
        Value::Number(number) => !number.as_f64().is_finite(),
        Value::Array(items) => items.iter().any(has_non_finite),
        Value::Object(map) => map.values().any(has_non_finite),
        _ => false,
    }
}

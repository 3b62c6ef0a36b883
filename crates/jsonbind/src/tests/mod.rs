mod arbitrary;

use crate::{JsonReader, JsonToken};

/// Drains `reader` into a flat, printable token list.
///
/// Numbers are rendered through `next_f64`, so `1`, `1.0` and `1e0` print the
/// same.
pub(crate) fn tokens(reader: &mut dyn JsonReader) -> Vec<String> {
    let mut out = Vec::new();
    loop {
        let item = match reader.peek().unwrap() {
            JsonToken::BeginArray => {
                reader.begin_array().unwrap();
                "[".to_owned()
            }
            JsonToken::EndArray => {
                reader.end_array().unwrap();
                "]".to_owned()
            }
            JsonToken::BeginObject => {
                reader.begin_object().unwrap();
                "{".to_owned()
            }
            JsonToken::EndObject => {
                reader.end_object().unwrap();
                "}".to_owned()
            }
            JsonToken::Name => format!("name {}", reader.next_name().unwrap()),
            JsonToken::String => format!("string {}", reader.next_string().unwrap()),
            JsonToken::Number => format!("number {}", reader.next_f64().unwrap()),
            JsonToken::Boolean => format!("bool {}", reader.next_bool().unwrap()),
            JsonToken::Null => {
                reader.next_null().unwrap();
                "null".to_owned()
            }
            JsonToken::EndDocument => return out,
        };
        out.push(item);
    }
}

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use base64::{Engine, engine::general_purpose::STANDARD};

use super::{
    CodecRegistry, DeserializerParameters, JsonDeserializer, JsonSerializer, Mappable,
    SerializerParameters,
};
use crate::{
    context::{DeserializationContext, SerializationContext},
    error::{Error, Result},
    reader::{JsonReader, unexpected},
    token::JsonToken,
    value::Value,
    writer::JsonWriter,
};

/// Implements [`Mappable`] for a scalar through a pair of unit codecs.
macro_rules! scalar_codec {
    ($ty:ty, $codec:ident, |$writer:ident, $value:ident| $write:expr, |$reader:ident, $ctx:ident| $read:expr) => {
        #[derive(Debug, Clone, Copy, Default)]
        struct $codec;

        impl JsonSerializer<$ty> for $codec {
            fn serialize(
                &self,
                $writer: &mut JsonWriter,
                $value: &$ty,
                _ctx: &mut SerializationContext,
                _params: &SerializerParameters,
            ) -> Result<()> {
                $write
            }
        }

        impl JsonDeserializer<$ty> for $codec {
            fn deserialize(
                &self,
                $reader: &mut dyn JsonReader,
                $ctx: &mut DeserializationContext,
                _params: &DeserializerParameters,
            ) -> Result<$ty> {
                $read
            }
        }

        impl Mappable for $ty {
            fn default_serializer(_: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
                Ok(Arc::new($codec))
            }

            fn default_deserializer(_: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
                Ok(Arc::new($codec))
            }
        }
    };
}

/// Implements [`Mappable`] for an integer narrower than `i64`. Values out of
/// range fail without being consumed.
macro_rules! integer_codec {
    ($($ty:ty => $codec:ident),* $(,)?) => {$(
        scalar_codec!(
            $ty,
            $codec,
            |writer, value| writer.value_i64(i64::from(*value)),
            |reader, ctx| {
                let value = reader.next_i64_in(i64::from(<$ty>::MIN)..=i64::from(<$ty>::MAX))?;
                <$ty>::try_from(value).map_err(|_| {
                    ctx.trace_error(
                        Error::number_format(format!(
                            "{value} does not fit in {}",
                            stringify!($ty)
                        )),
                        reader,
                    )
                })
            }
        );
    )*};
}

integer_codec!(
    i8 => I8Codec,
    i16 => I16Codec,
    u8 => U8Codec,
    u16 => U16Codec,
    u32 => U32Codec,
);

scalar_codec!(
    i32,
    I32Codec,
    |writer, value| writer.value_i64(i64::from(*value)),
    |reader, _ctx| reader.next_i32()
);

scalar_codec!(
    i64,
    I64Codec,
    |writer, value| writer.value_i64(*value),
    |reader, _ctx| reader.next_i64()
);

scalar_codec!(
    u64,
    U64Codec,
    |writer, value| writer.value_u64(*value),
    |reader, ctx| {
        let text = reader.next_string()?;
        text.parse::<u64>().map_err(|_| {
            ctx.trace_error(
                Error::number_format(format!("Expected an unsigned long but was {text}")),
                reader,
            )
        })
    }
);

scalar_codec!(
    f64,
    F64Codec,
    |writer, value| writer.value_f64(*value),
    |reader, _ctx| reader.next_f64()
);

scalar_codec!(
    f32,
    F32Codec,
    |writer, value| {
        if value.is_finite() {
            writer.value_number(ryu::Buffer::new().format_finite(*value))
        } else {
            writer.value_f64(f64::from(*value))
        }
    },
    |reader, _ctx| {
        #[allow(clippy::cast_possible_truncation)]
        let value = reader.next_f64()? as f32;
        Ok(value)
    }
);

scalar_codec!(
    bool,
    BoolCodec,
    |writer, value| writer.value_bool(*value),
    |reader, ctx| match reader.peek()? {
        JsonToken::Boolean => reader.next_bool(),
        JsonToken::String => Ok(reader.next_string()?.eq_ignore_ascii_case("true")),
        JsonToken::Number => Ok(reader.next_i32()? == 1),
        token => Err(ctx.trace_error(unexpected(JsonToken::Boolean, token), reader)),
    }
);

scalar_codec!(
    char,
    CharCodec,
    |writer, value| writer.value_str(value.encode_utf8(&mut [0; 4])),
    |reader, ctx| {
        if reader.peek()? == JsonToken::Number {
            let code = reader.next_i32()?;
            return u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    ctx.trace_error(
                        Error::number_format(format!("{code} is not a character")),
                        reader,
                    )
                });
        }
        let text = reader.next_string()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ctx.trace_error(
                Error::structural(format!("Expected a single character but was \"{text}\"")),
                reader,
            )),
        }
    }
);

scalar_codec!(
    (),
    UnitCodec,
    |writer, _value| writer.null_value(),
    |reader, _ctx| reader.skip_value()
);

scalar_codec!(
    Value,
    ValueCodec,
    |writer, value| value.write_to(writer),
    |reader, _ctx| Value::read_from(reader)
);

#[derive(Debug, Clone, Copy, Default)]
struct StringCodec;

impl JsonSerializer<String> for StringCodec {
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &String,
        _ctx: &mut SerializationContext,
        _params: &SerializerParameters,
    ) -> Result<()> {
        writer.value_str(value)
    }

    fn is_empty(&self, value: &String) -> bool {
        value.is_empty()
    }
}

impl JsonDeserializer<String> for StringCodec {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        _ctx: &mut DeserializationContext,
        _params: &DeserializerParameters,
    ) -> Result<String> {
        reader.next_string()
    }
}

impl Mappable for String {
    fn default_serializer(_: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(StringCodec))
    }

    fn default_deserializer(_: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(StringCodec))
    }
}

/// Bytes written as a base64 string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteBuf(pub Vec<u8>);

impl Deref for ByteBuf {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ByteBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<u8>> for ByteBuf {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ByteBufCodec;

impl JsonSerializer<ByteBuf> for ByteBufCodec {
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &ByteBuf,
        ctx: &mut SerializationContext,
        _params: &SerializerParameters,
    ) -> Result<()> {
        if value.is_empty() && !ctx.config().write_empty_json_arrays && writer.has_pending_name() {
            writer.cancel_name();
            return Ok(());
        }
        writer.value_str(&STANDARD.encode(&value.0))
    }

    fn is_empty(&self, value: &ByteBuf) -> bool {
        value.is_empty()
    }
}

impl JsonDeserializer<ByteBuf> for ByteBufCodec {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        _params: &DeserializerParameters,
    ) -> Result<ByteBuf> {
        let text = reader.next_string()?;
        STANDARD.decode(text.as_bytes()).map(ByteBuf).map_err(|err| {
            ctx.trace_error(Error::structural(format!("Invalid base64 value: {err}")), reader)
        })
    }
}

impl Mappable for ByteBuf {
    fn default_serializer(_: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(ByteBufCodec))
    }

    fn default_deserializer(_: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(ByteBufCodec))
    }
}

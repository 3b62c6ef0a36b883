//! Plain beans: required and unknown properties, inclusion policies, creators
//! and root wrapping.

use std::{collections::HashSet, sync::Arc};

use insta::assert_snapshot;
use jsonbind::{
    BeanDeserializer, BeanPropertyDeserializer, BeanPropertySerializer, BeanSerializer,
    CodecRegistry, DeserializationConfig, DeserializationContext, DeserializerParameters,
    ErrorKind, Include, InstanceBuilder, JsonDeserializer, JsonReader, JsonSerializer,
    JsonStreamReader, Location, Mappable, ObjectMapper, Result, SerializationConfig,
};
use rstest::rstest;

#[derive(Debug, Default, Clone, PartialEq)]
struct Person {
    name: String,
    age: i32,
    email: Option<String>,
    nickname: Option<String>,
    tags: Vec<String>,
}

impl Mappable for Person {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(
            BeanSerializer::new("Person")
                .property(BeanPropertySerializer::new("name", registry.serializer()?, |p: &Person| &p.name))
                .property(BeanPropertySerializer::new("age", registry.serializer()?, |p: &Person| &p.age))
                .property(BeanPropertySerializer::new("email", registry.serializer()?, |p: &Person| &p.email))
                .property(
                    BeanPropertySerializer::new("nickname", registry.serializer()?, |p: &Person| &p.nickname)
                        .include(Include::Always),
                )
                .property(
                    BeanPropertySerializer::new("tags", registry.serializer()?, |p: &Person| &p.tags)
                        .include(Include::NonEmpty),
                ),
        ))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(
            BeanDeserializer::new("Person", InstanceBuilder::default_constructor(Person::default))
                .property("name", true, BeanPropertyDeserializer::new(registry.deserializer()?, |p: &mut Person, v| p.name = v))
                .property("age", true, BeanPropertyDeserializer::new(registry.deserializer()?, |p: &mut Person, v| p.age = v))
                .property("email", false, BeanPropertyDeserializer::new(registry.deserializer()?, |p: &mut Person, v| p.email = v))
                .property("nickname", false, BeanPropertyDeserializer::new(registry.deserializer()?, |p: &mut Person, v| p.nickname = v))
                .property("tags", false, BeanPropertyDeserializer::new(registry.deserializer()?, |p: &mut Person, v| p.tags = v))
                .ignored("internal"),
        ))
    }
}

fn ada() -> Person {
    Person {
        name: "Ada".into(),
        age: 36,
        ..Person::default()
    }
}

fn mapper() -> ObjectMapper<Person> {
    ObjectMapper::new("Person").unwrap()
}

#[test]
fn round_trip() {
    let person = Person {
        email: Some("ada@example.com".into()),
        nickname: Some("countess".into()),
        tags: vec!["math".into(), "engines".into()],
        ..ada()
    };
    let json = mapper().write(&person).unwrap();
    assert_eq!(
        json,
        r#"{"name":"Ada","age":36,"email":"ada@example.com","nickname":"countess","tags":["math","engines"]}"#
    );
    assert_eq!(mapper().read(&json).unwrap(), person);
}

#[test]
fn properties_may_come_in_any_order() {
    let person = mapper()
        .read(r#"{"tags":["x"],"age":36,"name":"Ada"}"#)
        .unwrap();
    assert_eq!(person.tags, vec!["x"]);
    assert_eq!(person.name, "Ada");
}

#[test]
fn missing_required_properties_are_all_listed() {
    let err = mapper().read(r#"{"email":null}"#).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::MissingRequiredProperties(vec!["name".into(), "age".into()])
    );
    assert_eq!(err.kind().to_string(), "Required properties are missing: [name, age]");

    let err = mapper().read(r#"{"age":1}"#).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::MissingRequiredProperties(vec!["name".into()])
    );
}

#[test]
fn unknown_properties_fail_with_their_position() {
    let err = mapper()
        .read("{\"name\":\"Ada\",\n\"shoe\":44,\"age\":36}")
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownProperty("shoe".into()));
    assert_eq!(err.location().map(|location| location.line), Some(2));
}

#[test]
fn unknown_properties_can_be_skipped() {
    let lenient = mapper().with_deserialization_config(DeserializationConfig {
        fail_on_unknown_properties: false,
        ..DeserializationConfig::default()
    });
    let person = lenient
        .read(r#"{"shoe":{"size":[44, 45]},"name":"Ada","age":36}"#)
        .unwrap();
    assert_eq!(person, ada());
}

#[test]
fn ignored_properties_are_never_read() {
    let person = mapper()
        .read(r#"{"name":"Ada","internal":{"deep":[1,{"x":null}]},"age":36}"#)
        .unwrap();
    assert_eq!(person, ada());
}

fn read_with_params(json: &str, params: &DeserializerParameters) -> Result<Person> {
    let deserializer = CodecRegistry::new().deserializer::<Person>()?;
    let mut ctx = DeserializationContext::new(DeserializationConfig::default());
    let mut reader = JsonStreamReader::new(json);
    let person = deserializer.deserialize(&mut reader, &mut ctx, params)?;
    reader.close();
    Ok(person)
}

#[test]
fn per_call_parameters_extend_the_bean_settings() {
    let json = r#"{"name":"Ada","age":36,"email":"x","shoe":44}"#;
    assert!(read_with_params(json, &DeserializerParameters::default()).is_err());

    let params = DeserializerParameters {
        ignore_unknown: true,
        ignored_properties: HashSet::from(["email".to_owned()]),
        ..DeserializerParameters::default()
    };
    let person = read_with_params(json, &params).unwrap();
    assert_eq!(person, ada());

    // The bean's own ignored names still apply.
    let json = r#"{"name":"Ada","age":36,"internal":1}"#;
    assert_eq!(read_with_params(json, &params).unwrap(), ada());
}

#[rstest]
#[case::nulls_written(true, r#"{"name":"Ada","age":36,"email":null,"nickname":null}"#)]
#[case::nulls_dropped(false, r#"{"name":"Ada","age":36,"nickname":null}"#)]
fn null_properties(#[case] serialize_nulls: bool, #[case] expected: &str) {
    let mapper = mapper().with_serialization_config(SerializationConfig {
        serialize_nulls,
        ..SerializationConfig::default()
    });
    assert_eq!(mapper.write(&ada()).unwrap(), expected);
}

#[test]
fn pretty_printing() {
    let mapper = mapper().with_serialization_config(SerializationConfig {
        indent: Some("  ".to_owned()),
        ..SerializationConfig::default()
    });
    let person = Person {
        tags: vec!["math".into()],
        ..ada()
    };
    assert_snapshot!(mapper.write(&person).unwrap(), @r#"
    {
      "name": "Ada",
      "age": 36,
      "email": null,
      "nickname": null,
      "tags": [
        "math"
      ]
    }
    "#);
}

#[test]
fn root_wrapping() {
    let mapper = mapper()
        .with_serialization_config(SerializationConfig {
            wrap_root_value: true,
            serialize_nulls: false,
            ..SerializationConfig::default()
        })
        .with_deserialization_config(DeserializationConfig {
            unwrap_root_value: true,
            ..DeserializationConfig::default()
        });
    let json = mapper.write(&ada()).unwrap();
    assert_eq!(json, r#"{"Person":{"name":"Ada","age":36,"nickname":null}}"#);
    assert_eq!(mapper.read(&json).unwrap(), ada());
    assert!(mapper.read(r#"{"Human":{"name":"Ada","age":36}}"#).is_err());
}

// ---- nested beans ----

#[derive(Debug, Default, PartialEq)]
struct Team {
    lead: Option<Box<Person>>,
    members: Vec<Person>,
}

impl Mappable for Team {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(
            BeanSerializer::new("Team")
                .property(BeanPropertySerializer::new("lead", registry.serializer()?, |t: &Team| &t.lead))
                .property(BeanPropertySerializer::new("members", registry.serializer()?, |t: &Team| &t.members)),
        ))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(
            BeanDeserializer::new("Team", InstanceBuilder::default_constructor(Team::default))
                .property("lead", false, BeanPropertyDeserializer::new(registry.deserializer()?, |t: &mut Team, v| t.lead = v))
                .property("members", false, BeanPropertyDeserializer::new(registry.deserializer()?, |t: &mut Team, v| t.members = v)),
        ))
    }
}

#[test]
fn nested_beans() {
    let team = Team {
        lead: Some(Box::new(ada())),
        members: vec![
            Person {
                name: "Bob".into(),
                age: 40,
                ..Person::default()
            },
        ],
    };
    let mapper = ObjectMapper::<Team>::new("Team")
        .unwrap()
        .with_serialization_config(SerializationConfig {
            serialize_nulls: false,
            ..SerializationConfig::default()
        });
    let json = mapper.write(&team).unwrap();
    assert_eq!(
        json,
        r#"{"lead":{"name":"Ada","age":36,"nickname":null},"members":[{"name":"Bob","age":40,"nickname":null}]}"#
    );
    assert_eq!(mapper.read(&json).unwrap(), team);

    let err = mapper.read(r#"{"members":[{"name":"Bob"}]}"#).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::MissingRequiredProperties(vec!["age".into()])
    );
}

// ---- creators ----

#[derive(Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
    label: String,
}

impl Mappable for Point {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(
            BeanSerializer::new("Point")
                .property(BeanPropertySerializer::new("x", registry.serializer()?, |p: &Point| &p.x))
                .property(BeanPropertySerializer::new("y", registry.serializer()?, |p: &Point| &p.y))
                .property(BeanPropertySerializer::new("label", registry.serializer()?, |p: &Point| &p.label)),
        ))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        let coordinate = registry.deserializer::<i32>()?;
        let builder = InstanceBuilder::creator(["x", "y"], move |args| {
            Ok(Point {
                x: args.get("x", &*coordinate)?.unwrap_or_default(),
                y: args.get("y", &*coordinate)?.unwrap_or_default(),
                label: String::new(),
            })
        });
        Ok(Arc::new(
            BeanDeserializer::new("Point", builder)
                .property("x", true, BeanPropertyDeserializer::new(registry.deserializer()?, |p: &mut Point, v| p.x = v))
                .property("y", true, BeanPropertyDeserializer::new(registry.deserializer()?, |p: &mut Point, v| p.y = v))
                .property("label", false, BeanPropertyDeserializer::new(registry.deserializer()?, |p: &mut Point, v| p.label = v)),
        ))
    }
}

#[rstest]
#[case::creator_first(r#"{"x":1,"y":2,"label":"p"}"#)]
#[case::buffered_before(r#"{"label":"p","y":2,"x":1}"#)]
#[case::buffered_between(r#"{"x":1,"label":"p","y":2}"#)]
fn creators_buffer_earlier_properties(#[case] json: &str) {
    let mapper = ObjectMapper::<Point>::new("Point").unwrap();
    assert_eq!(
        mapper.read(json).unwrap(),
        Point {
            x: 1,
            y: 2,
            label: "p".into()
        }
    );
}

#[test]
fn missing_creator_properties_are_reported() {
    let mapper = ObjectMapper::<Point>::new("Point").unwrap();
    let err = mapper.read(r#"{"label":"p","x":1}"#).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::MissingRequiredProperties(vec!["y".into()])
    );
}

#[test]
fn buffered_properties_are_checked_like_the_others() {
    let mapper = ObjectMapper::<Point>::new("Point").unwrap();
    let err = mapper.read(r#"{"z":0,"x":1,"y":2}"#).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownProperty("z".into()));
}

#[rstest]
#[case::buffered_unknown("{\"label\":\"p\",\n\n   \"z\":0,\"x\":1,\"y\":2}", 3, 8)]
#[case::creator_argument("{\"label\":\"p\",\n\n   \"x\":1,\"y\":true}", 3, 14)]
#[case::value_on_its_own_line("{\"x\":1,\n\"y\":\n 2.5}", 3, 2)]
fn errors_in_read_ahead_properties_point_into_the_input(
    #[case] json: &str,
    #[case] line: usize,
    #[case] column: usize,
) {
    let mapper = ObjectMapper::<Point>::new("Point").unwrap();
    let err = mapper.read(json).unwrap_err();
    assert_eq!(err.location(), Some(Location { line, column }), "{err}");
}

#[test]
fn read_ahead_properties_of_trees_have_no_location() {
    let mapper = ObjectMapper::<Point>::new("Point").unwrap();
    let tree = jsonbind::Value::parse(r#"{"label":"p","z":0,"x":1,"y":2}"#).unwrap();
    let err = mapper.read_value(&tree).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownProperty("z".into()));
    assert_eq!(err.location(), None);
}

// ---- raw values ----

#[derive(Debug, PartialEq)]
struct Envelope {
    kind: String,
    payload: String,
}

struct RawJson;

impl JsonDeserializer<String> for RawJson {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        _ctx: &mut DeserializationContext,
        _params: &DeserializerParameters,
    ) -> Result<String> {
        reader.next_value()
    }
}

impl Mappable for Envelope {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(
            BeanSerializer::new("Envelope")
                .property(BeanPropertySerializer::new("kind", registry.serializer()?, |e: &Envelope| &e.kind))
                .property(BeanPropertySerializer::raw("payload", |e: &Envelope| &e.payload)),
        ))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        let raw: Arc<dyn JsonDeserializer<String>> = Arc::new(RawJson);
        let new = || Envelope {
            kind: String::new(),
            payload: String::new(),
        };
        Ok(Arc::new(
            BeanDeserializer::new("Envelope", InstanceBuilder::default_constructor(new))
                .property("kind", true, BeanPropertyDeserializer::new(registry.deserializer()?, |e: &mut Envelope, v| e.kind = v))
                .property("payload", true, BeanPropertyDeserializer::new(raw, |e: &mut Envelope, v| e.payload = v)),
        ))
    }
}

#[test]
fn raw_properties_are_written_verbatim() {
    let mapper = ObjectMapper::<Envelope>::new("Envelope").unwrap();
    let envelope = Envelope {
        kind: "event".into(),
        payload: r#"{"a":[1,true]}"#.into(),
    };
    let json = mapper.write(&envelope).unwrap();
    assert_eq!(json, r#"{"kind":"event","payload":{"a":[1,true]}}"#);
    assert_eq!(mapper.read(&json).unwrap(), envelope);
}

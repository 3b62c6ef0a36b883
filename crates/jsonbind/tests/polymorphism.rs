//! Polymorphic beans: the three discriminator shapes, dispatch failures and
//! back references set through subtypes.

use std::sync::Arc;

use jsonbind::{
    As, BeanDeserializer, BeanPropertyDeserializer, BeanPropertySerializer, BeanSerializer,
    CodecRegistry, DeserializationConfig, DeserializationContext, DeserializerParameters,
    ErrorKind, InstanceBuilder, JsonDeserializer, JsonSerializer, JsonStreamReader, Mappable,
    ObjectMapper, Result, TypeInfo,
};
use rstest::rstest;

#[derive(Debug, Default, Clone, PartialEq)]
struct Dog {
    name: String,
    bark: String,
    owner: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Cat {
    name: String,
    lives: i32,
    owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Animal {
    Dog(Dog),
    Cat(Cat),
}

impl Animal {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Dog(_) => "Dog",
            Self::Cat(_) => "Cat",
        }
    }
}

fn as_dog(animal: &Animal) -> Option<&Dog> {
    match animal {
        Animal::Dog(dog) => Some(dog),
        Animal::Cat(_) => None,
    }
}

fn as_dog_mut(animal: &mut Animal) -> Option<&mut Dog> {
    match animal {
        Animal::Dog(dog) => Some(dog),
        Animal::Cat(_) => None,
    }
}

fn as_cat(animal: &Animal) -> Option<&Cat> {
    match animal {
        Animal::Cat(cat) => Some(cat),
        Animal::Dog(_) => None,
    }
}

fn as_cat_mut(animal: &mut Animal) -> Option<&mut Cat> {
    match animal {
        Animal::Cat(cat) => Some(cat),
        Animal::Dog(_) => None,
    }
}

fn type_info(include: As) -> TypeInfo {
    TypeInfo::new(include, "@class")
        .with_type("Dog", "dog")
        .with_type("Cat", "cat")
        .with_type("Fish", "fish")
}

fn dog_serializer(registry: &CodecRegistry) -> Result<BeanSerializer<Dog>> {
    Ok(BeanSerializer::new("Dog")
        .property(BeanPropertySerializer::new("name", registry.serializer()?, |d: &Dog| &d.name))
        .property(BeanPropertySerializer::new("bark", registry.serializer()?, |d: &Dog| &d.bark)))
}

fn dog_deserializer(registry: &CodecRegistry) -> Result<BeanDeserializer<Dog>> {
    Ok(
        BeanDeserializer::new("Dog", InstanceBuilder::default_constructor(Dog::default))
            .property("name", true, BeanPropertyDeserializer::new(registry.deserializer()?, |d: &mut Dog, v| d.name = v))
            .property("bark", false, BeanPropertyDeserializer::new(registry.deserializer()?, |d: &mut Dog, v| d.bark = v))
            .back_reference("owner", |d: &mut Dog, owner: &Owner| {
                d.owner = Some(owner.name.clone());
            }),
    )
}

fn cat_serializer(registry: &CodecRegistry) -> Result<BeanSerializer<Cat>> {
    Ok(BeanSerializer::new("Cat")
        .property(BeanPropertySerializer::new("name", registry.serializer()?, |c: &Cat| &c.name))
        .property(BeanPropertySerializer::new("lives", registry.serializer()?, |c: &Cat| &c.lives)))
}

fn cat_deserializer(registry: &CodecRegistry) -> Result<BeanDeserializer<Cat>> {
    Ok(
        BeanDeserializer::new("Cat", InstanceBuilder::default_constructor(Cat::default))
            .property("name", true, BeanPropertyDeserializer::new(registry.deserializer()?, |c: &mut Cat, v| c.name = v))
            .property("lives", false, BeanPropertyDeserializer::new(registry.deserializer()?, |c: &mut Cat, v| c.lives = v))
            .back_reference("owner", |c: &mut Cat, owner: &Owner| {
                c.owner = Some(owner.name.clone());
            }),
    )
}

fn animal_serializer(registry: &CodecRegistry, type_info: TypeInfo) -> Result<BeanSerializer<Animal>> {
    Ok(BeanSerializer::new("Animal")
        .type_info(type_info)
        .runtime_type(Animal::type_name)
        .subtype(Arc::new(dog_serializer(registry)?), as_dog)
        .subtype(Arc::new(cat_serializer(registry)?), as_cat))
}

fn animal_deserializer(registry: &CodecRegistry) -> Result<BeanDeserializer<Animal>> {
    Ok(BeanDeserializer::abstract_type("Animal")
        .runtime_type(Animal::type_name)
        .subtype(Arc::new(dog_deserializer(registry)?), Animal::Dog, as_dog_mut)
        .subtype(Arc::new(cat_deserializer(registry)?), Animal::Cat, as_cat_mut))
}

impl Mappable for Animal {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(animal_serializer(registry, type_info(As::Property))?))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(
            animal_deserializer(registry)?.type_info(type_info(As::Property)),
        ))
    }
}

fn mapper(include: As) -> ObjectMapper<Animal> {
    let registry = CodecRegistry::new();
    ObjectMapper::from_codecs(
        "Animal",
        Arc::new(animal_serializer(&registry, type_info(include)).unwrap()),
        Arc::new(
            animal_deserializer(&registry)
                .unwrap()
                .type_info(type_info(include)),
        ),
    )
}

fn rex() -> Animal {
    Animal::Dog(Dog {
        name: "Rex".into(),
        bark: "woof".into(),
        owner: None,
    })
}

fn tom() -> Animal {
    Animal::Cat(Cat {
        name: "Tom".into(),
        lives: 9,
        owner: None,
    })
}

#[rstest]
#[case::property(As::Property, r#"{"@class":"dog","name":"Rex","bark":"woof"}"#)]
#[case::wrapper_object(As::WrapperObject, r#"{"dog":{"name":"Rex","bark":"woof"}}"#)]
#[case::wrapper_array(As::WrapperArray, r#"["dog",{"name":"Rex","bark":"woof"}]"#)]
fn discriminator_shapes(#[case] include: As, #[case] expected: &str) {
    let mapper = mapper(include);
    assert_eq!(mapper.write(&rex()).unwrap(), expected);
    assert_eq!(mapper.read(expected).unwrap(), rex());
}

#[test]
fn mixed_lists() {
    let mapper = ObjectMapper::<Vec<Animal>>::new("animals").unwrap();
    let json = mapper.write(&vec![rex(), tom()]).unwrap();
    assert_eq!(
        json,
        r#"[{"@class":"dog","name":"Rex","bark":"woof"},{"@class":"cat","name":"Tom","lives":9}]"#
    );
    assert_eq!(mapper.read(&json).unwrap(), vec![rex(), tom()]);
}

#[test]
fn unknown_discriminators() {
    let err = mapper(As::Property)
        .read(r#"{"@class":"bird","name":"Tweety"}"#)
        .unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::SubtypeResolution("Could not find the type associated to bird".into())
    );

    let err = mapper(As::WrapperObject)
        .read(r#"{"fish":{"name":"Nemo"}}"#)
        .unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::SubtypeResolution("No deserializer found for the type Fish".into())
    );
}

#[test]
fn the_discriminator_comes_first() {
    let err = mapper(As::Property)
        .read(r#"{"name":"Rex","@class":"dog"}"#)
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Structural(_)));
    assert!(err.location().is_some());
}

#[test]
fn abstract_types_need_type_info() {
    let registry = CodecRegistry::new();
    let deserializer = animal_deserializer(&registry).unwrap();
    let mut ctx = DeserializationContext::new(DeserializationConfig::default());
    let json = r#"{"name":"Rex"}"#;

    let err = deserializer
        .deserialize(
            &mut JsonStreamReader::new(json),
            &mut ctx,
            &DeserializerParameters::default(),
        )
        .unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::SubtypeResolution("Cannot instantiate the type Animal".into())
    );

    // Type info handed in per call is enough.
    let params = DeserializerParameters {
        type_info: Some(type_info(As::WrapperArray)),
        ..DeserializerParameters::default()
    };
    let animal = deserializer
        .deserialize(
            &mut JsonStreamReader::new(r#"["cat",{"name":"Tom","lives":9}]"#),
            &mut ctx,
            &params,
        )
        .unwrap();
    assert_eq!(animal, tom());
}

#[test]
fn untagged_subtypes_are_written_plain() {
    let registry = CodecRegistry::new();
    let dogs_only = TypeInfo::new(As::Property, "@class").with_type("Dog", "dog");
    let mapper = ObjectMapper::from_codecs(
        "Animal",
        Arc::new(animal_serializer(&registry, dogs_only).unwrap()),
        Arc::new(animal_deserializer(&registry).unwrap()),
    );
    assert_eq!(mapper.write(&tom()).unwrap(), r#"{"name":"Tom","lives":9}"#);
}

// ---- back references ----

#[derive(Debug, Default, PartialEq)]
struct Owner {
    name: String,
    pets: Vec<Animal>,
}

impl Mappable for Owner {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(
            BeanSerializer::new("Owner")
                .property(BeanPropertySerializer::new("name", registry.serializer()?, |o: &Owner| &o.name))
                .property(BeanPropertySerializer::new("pets", registry.serializer()?, |o: &Owner| &o.pets)),
        ))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(
            BeanDeserializer::new("Owner", InstanceBuilder::default_constructor(Owner::default))
                .property("name", true, BeanPropertyDeserializer::new(registry.deserializer()?, |o: &mut Owner, v| o.name = v))
                .property(
                    "pets",
                    false,
                    BeanPropertyDeserializer::managed_reference(
                        registry.deserializer()?,
                        "owner",
                        |o: &mut Owner, v| o.pets = v,
                    ),
                ),
        ))
    }
}

#[test]
fn back_references_reach_every_subtype() {
    let mapper = ObjectMapper::<Owner>::new("Owner").unwrap();
    let owner = mapper
        .read(r#"{"name":"Ann","pets":[{"@class":"dog","name":"Rex"},{"@class":"cat","name":"Tom","lives":9}]}"#)
        .unwrap();
    let owners: Vec<_> = owner
        .pets
        .iter()
        .map(|pet| match pet {
            Animal::Dog(dog) => dog.owner.as_deref(),
            Animal::Cat(cat) => cat.owner.as_deref(),
        })
        .collect();
    assert_eq!(owners, vec![Some("Ann"), Some("Ann")]);

    // The back reference itself is never written.
    assert_eq!(
        mapper.write(&owner).unwrap(),
        r#"{"name":"Ann","pets":[{"@class":"dog","name":"Rex","bark":""},{"@class":"cat","name":"Tom","lives":9}]}"#
    );
}

#[test]
fn back_reference_failures() {
    let registry = CodecRegistry::new();
    let deserializer = registry.deserializer::<Animal>().unwrap();
    let mut ctx = DeserializationContext::new(DeserializationConfig::default());
    let owner = Owner::default();
    let mut animal = rex();

    let err = deserializer
        .set_back_reference("keeper", &owner, &mut animal, &mut ctx)
        .unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Codec("The back reference 'keeper' does not exist".into())
    );

    let err = deserializer
        .set_back_reference("owner", &"Ann", &mut animal, &mut ctx)
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Codec(msg) if msg.contains("expects a")));
}

use aida::{AnyValue, AnyVector, FieldVector, Payload, TypeKind, TypeMap};
use aida_format::{encode, EnumValueDecl, TypeDecl};

#[test]
fn scalars_round_trip() {
    assert_eq!(AnyValue::from(true).get::<bool>(), Some(true));
    assert_eq!(AnyValue::from(-7i8).get::<i8>(), Some(-7));
    assert_eq!(AnyValue::from(i16::MIN).get::<i16>(), Some(i16::MIN));
    assert_eq!(AnyValue::from(i32::MAX).get::<i32>(), Some(i32::MAX));
    assert_eq!(AnyValue::from(i64::MIN).get::<i64>(), Some(i64::MIN));
    assert_eq!(AnyValue::from(u8::MAX).get::<u8>(), Some(u8::MAX));
    assert_eq!(AnyValue::from(u16::MAX).get::<u16>(), Some(u16::MAX));
    assert_eq!(AnyValue::from(u32::MAX).get::<u32>(), Some(u32::MAX));
    assert_eq!(AnyValue::from(u64::MAX).get::<u64>(), Some(u64::MAX));
    assert_eq!(AnyValue::from(1.5f32).get::<f32>(), Some(1.5));
    assert_eq!(AnyValue::from(f64::MIN_POSITIVE).get::<f64>(), Some(f64::MIN_POSITIVE));
    assert_eq!(
        AnyValue::from("grüße").get::<String>().as_deref(),
        Some("grüße")
    );
}

#[test]
fn narrow_scalars_are_stored_wide() {
    assert_eq!(AnyValue::from(3u8).kind(), TypeKind::Int64);
    assert_eq!(AnyValue::from(3u8), AnyValue::from(3i64));
    assert_eq!(AnyValue::from(0.25f32).kind(), TypeKind::Float64);
    assert_eq!(AnyValue::from(3i32).type_code().name(), "int64");
    assert_eq!(AnyValue::from("s").type_code().kind(), TypeKind::String);
    assert!(AnyValue::new().type_code().is_untyped());
}

#[test]
fn set_replaces_previous_payload() {
    let mut value = AnyValue::from("text");
    value.set(12u16);
    assert_eq!(value.kind(), TypeKind::Int64);
    assert_eq!(value.get::<u16>(), Some(12));
    value.set_any(AnyValue::from(false));
    assert_eq!(value.kind(), TypeKind::Any);
    assert_eq!(value.get::<AnyValue>(), Some(AnyValue::from(false)));
}

#[test]
fn clones_are_independent() {
    let mut original = AnyValue::from(
        FieldVector::new()
            .with("name", "left")
            .with("gains", [0.5f64, 0.75].into_iter().collect::<AnyVector>()),
    );
    let copy = original.clone();
    assert_eq!(original, copy);

    original
        .as_record_mut()
        .unwrap()
        .set("name", "right");
    assert_ne!(original, copy);
    assert_eq!(
        copy.field("name").and_then(|v| v.get::<String>()).as_deref(),
        Some("left")
    );
    assert_eq!(
        copy.field("gains").and_then(|v| v.get::<AnyVector>()).map(|v| v.len()),
        Some(2)
    );
}

#[test]
fn equality_rules() {
    assert_eq!(AnyValue::new(), AnyValue::new());
    assert_ne!(AnyValue::from(1i32), AnyValue::from(1.0f64));
    assert_ne!(AnyValue::from(1i32), AnyValue::from(true));
    assert_ne!(AnyValue::from(""), AnyValue::new());
    assert_eq!(
        AnyValue::wrap(AnyValue::wrap(AnyValue::from(2i32))),
        AnyValue::wrap(AnyValue::wrap(AnyValue::from(2u64)))
    );
    assert_ne!(
        AnyValue::wrap(AnyValue::from(2i32)),
        AnyValue::wrap(AnyValue::wrap(AnyValue::from(2i32)))
    );
    let seq = |items: &[i32]| AnyValue::from(items.iter().copied().collect::<AnyVector>());
    assert_eq!(seq(&[1, 2]), seq(&[1, 2]));
    assert_ne!(seq(&[1, 2]), seq(&[2, 1]));
    assert_ne!(seq(&[1]), seq(&[1, 1]));
}

#[test]
fn sequences_resize() {
    let mut value = AnyValue::from(9i32);
    value.resize(3);
    assert_eq!(value.kind(), TypeKind::Sequence);
    let items = value.as_sequence_mut().unwrap();
    assert!(items.iter().all(AnyValue::is_untyped));
    items[1].set("middle");
    value.resize(2);
    assert_eq!(value.as_sequence().unwrap()[1], AnyValue::from("middle"));
}

#[test]
fn enum_values_carry_their_type() {
    let blob = encode(&[TypeDecl::enumeration(
        "Quality",
        vec![
            EnumValueDecl::new("QUALITY_LOW", 10),
            EnumValueDecl::new("QUALITY_HIGH", 20),
        ],
    )])
    .unwrap();
    let map = TypeMap::from_bytes(blob).unwrap();
    let quality = map.lookup_local("Quality").unwrap();

    let value = AnyValue::from_enum(&quality, 20);
    assert_eq!(value.kind(), TypeKind::Enum);
    assert_eq!(value.type_code(), quality);
    assert_eq!(value.enum_ident().as_deref(), Some("QUALITY_HIGH"));
    assert_eq!(value.get::<i32>(), Some(20));
    assert_eq!(value.get::<String>().as_deref(), Some("QUALITY_HIGH"));
    assert_eq!(value.to_string(), "QUALITY_HIGH");

    let unknown = AnyValue::from_enum(&quality, 30);
    assert_eq!(unknown.enum_ident(), None);
    assert_eq!(unknown.get::<String>().as_deref(), Some("30"));

    let int64 = TypeMap::builtins().lookup_local("int64").unwrap();
    let plain = AnyValue::from_enum(&int64, 5);
    assert_eq!(plain.payload(), &Payload::Int64(5));
}

#[test]
fn retype_keeps_compatible_payloads() {
    let builtins = TypeMap::builtins();
    let int32 = builtins.lookup_local("int32").unwrap();
    let string = builtins.lookup_local("string").unwrap();

    let mut value = AnyValue::from(41i64);
    value.retype(&int32);
    assert_eq!(value.get::<i32>(), Some(41));
    assert_eq!(value.type_code(), int32);

    value.retype(&string);
    assert_eq!(value.get::<String>().as_deref(), Some(""));
    assert_eq!(value.type_code(), string);
}

use std::sync::Arc;

use astruct::{
    AccessError, CapacityError, Codec, CodecError, CountedTable, CountedTableMut, EncodingPolicy,
    ErrorMode, Field, FieldKind, Primitive, Record, RecordRef, Registry, Schema, StrSpec,
    StructLayout, TableHeader, Value,
};

fn policy(codec: Codec, errors: ErrorMode) -> Arc<EncodingPolicy> {
    Arc::new(EncodingPolicy::new(codec, errors))
}

fn item(name: StrSpec) -> Arc<StructLayout> {
    Arc::new(
        Schema::new("Item")
            .field(Field::u16("id"))
            .field(Field::str_with("name", name))
            .compile()
            .unwrap(),
    )
}

fn ascii(len: usize) -> StrSpec {
    StrSpec::new(len).with_policy(policy(Codec::Ascii, ErrorMode::Strict))
}

/// La Pucelle skill record, 126 bytes.
fn skill() -> Schema {
    let wide = policy(Codec::WideShiftJis, ErrorMode::Strict);
    Schema::new("Skill")
        .field(Field::u16("strength"))
        .field(Field::u16("is_randomly_activated"))
        .field(Field::u8("id"))
        .field(Field::u16("category_id"))
        .field(Field::u8("_zero"))
        .field(Field::array("attr_requirements", Primitive::U8.into(), 8))
        .field(Field::str_with("name", StrSpec::new(35).with_policy(wide.clone())))
        .field(Field::str_with("description", StrSpec::new(75).with_policy(wide)))
}

#[test]
fn terminated_ascii_name() {
    let layout = item(ascii(8));
    assert_eq!(layout.size(), 10);
    assert_eq!(layout.offset_of("id"), Some(0));
    assert_eq!(layout.offset_of("name"), Some(2));
    assert_eq!(layout.field("name").unwrap().width(), 8);

    let mut record = Record::new(layout);
    record.set_text("name", "AB").unwrap();
    assert_eq!(&record.as_bytes()[2..], b"AB\0\0\0\0\0\0");

    let copy = Record::from_bytes(record.layout().clone(), record.as_bytes()).unwrap();
    assert_eq!(copy.get_text("name").unwrap(), "AB");
}

#[test]
fn fixed_width_ascii_name() {
    let mut record = Record::new(item(ascii(8).fixed_width()));

    assert_eq!(
        record.set_text("name", "AB"),
        Err(AccessError::Capacity(CapacityError::LengthMismatch {
            field: "name".to_string(),
            len: 2,
            width: 8,
        }))
    );
    assert_eq!(record.as_bytes(), &[0; 10]);

    record.set_text("name", "ABCDEFGH").unwrap();
    assert_eq!(&record.as_bytes()[2..], b"ABCDEFGH");
    assert_eq!(record.get_text("name").unwrap(), "ABCDEFGH");
}

#[test]
fn strict_and_lossless_decoding_of_unmapped_bytes() {
    let buf = *b"\x01\x00A\xffB\0\0\0\0\0";

    let strict = item(ascii(8));
    let record = RecordRef::new(&strict, &buf).unwrap();
    assert!(matches!(
        record.get_text("name"),
        Err(AccessError::Codec {
            source: CodecError::Undecodable { offset: 1, .. },
            ..
        })
    ));

    let lossless = item(StrSpec::new(8).with_policy(policy(Codec::Ascii, ErrorMode::Lossless)));
    let mut record = Record::from_bytes(lossless, &buf).unwrap();
    let text = record.get_text("name").unwrap();
    assert_eq!(text.chars().count(), 3);

    record.set_text("name", &text).unwrap();
    assert_eq!(record.as_bytes(), &buf);
}

#[test]
fn non_strict_modes_resolve_each_invalid_run_once() {
    let buf = *b"\x00\x00A\xff\xfeB\xfdC\0\0\0";
    let read = |errors| {
        let layout = item(StrSpec::new(9).with_policy(policy(Codec::Ascii, errors)));
        RecordRef::new(&layout, &buf).unwrap().get_text("name").unwrap()
    };

    assert_eq!(read(ErrorMode::Ignore), "ABC");
    assert_eq!(read(ErrorMode::Replace), "A\u{fffd}B\u{fffd}C");
    assert_eq!(read(ErrorMode::BackslashReplace), "A\\xff\\xfeB\\xfdC");
}

#[test]
fn shift_jis_rejects_text_that_would_read_back_differently() {
    // Default policy: Shift-JIS, strict.
    let mut record = Record::new(item(StrSpec::new(8)));
    record.set_text("name", "\\").unwrap();

    for text in ["¥", "‾", "−"] {
        let character = text.chars().next().unwrap();
        assert!(matches!(
            record.set_text("name", text),
            Err(AccessError::Codec {
                source: CodecError::Unencodable { character: c, index: 0, .. },
                ..
            }) if c == character
        ));
        assert_eq!(record.get_text("name").unwrap(), "\\");
    }

    record.set_text("name", "－").unwrap();
    assert_eq!(&record.as_bytes()[2..5], &[0x81, 0x7c, 0]);
    assert_eq!(record.get_text("name").unwrap(), "－");
}

#[test]
fn skill_record_layout_and_text() {
    let layout = Arc::new(skill().compile().unwrap());
    assert_eq!(layout.size(), 126);
    assert_eq!(layout.offset_of("attr_requirements"), Some(8));
    assert_eq!(layout.offset_of("name"), Some(16));
    assert_eq!(layout.offset_of("description"), Some(51));

    let mut record = Record::new(layout);
    record.set("category_id", 0x090eu16).unwrap();
    record.set_element("attr_requirements", 2, 5u8).unwrap();
    record.set_text("name", "Purify Power +6").unwrap();

    // Printable ASCII is stored as full-width Shift-JIS.
    assert_eq!(&record.as_bytes()[16..18], &[0x82, 0x6f]);
    assert_eq!(record.get_text("name").unwrap(), "Purify Power +6");
    assert_eq!(record.get("category_id"), Ok(Value::UInt(0x090e)));
    assert_eq!(record.get_element("attr_requirements", 2), Ok(Value::UInt(5)));

    // 18 characters are 36 bytes: one more than fits before the terminator.
    assert!(matches!(
        record.set_text("name", "Purify Power +6789"),
        Err(AccessError::Capacity(CapacityError::Overflow {
            len: 36,
            capacity: 34,
            ..
        }))
    ));
    assert_eq!(record.get_text("name").unwrap(), "Purify Power +6");
}

#[test]
fn skill_table() {
    let layout = skill().compile().unwrap();
    let mut buf = vec![2, 0, 0, 0, 2, 0, 0, 0];
    buf.resize(8 + 2 * layout.size(), 0);

    {
        let mut table = CountedTableMut::parse(&layout, &mut buf, 0, TableHeader::Double).unwrap();
        for (i, mut skill) in table.iter_mut().enumerate() {
            skill.set("id", (i as u8) + 1).unwrap();
            skill.set_text("name", ["Chakra", "Super Dodge"][i]).unwrap();
        }
    }

    let table = CountedTable::parse(&layout, &buf, 0, TableHeader::Double).unwrap();
    assert_eq!(table.len(), 2);

    let dodge = table
        .find(|s| s.get_text("name").as_deref() == Ok("Super Dodge"))
        .unwrap();
    assert_eq!(dodge.get("id"), Ok(Value::UInt(2)));
}

#[test]
fn registry_nested_declarations() {
    let registry = Registry::new();
    registry
        .declare(
            &Schema::new("ItemStat")
                .field(Field::u16("base"))
                .field(Field::u8("growth")),
        )
        .unwrap();

    let class = Schema::new("Class")
        .field(Field::u16("id"))
        .field(Field::new(
            "stats",
            FieldKind::array(FieldKind::StructRef("ItemStat".to_string()), 8),
        ));
    let layout = registry.declare(&class).unwrap();
    assert_eq!(layout.size(), 2 + 8 * 3);

    let mut record = Record::new(layout.clone());
    let mut stat = std::collections::BTreeMap::new();
    stat.insert("base".to_string(), Value::UInt(120));
    stat.insert("growth".to_string(), Value::UInt(3));
    record.set_element("stats", 7, stat.clone()).unwrap();
    assert_eq!(record.get_element("stats", 7), Ok(Value::Struct(stat)));
    assert_eq!(&record.as_bytes()[23..26], &[120, 0, 3]);

    assert!(Arc::ptr_eq(&layout, &registry.declare(&class).unwrap()));
}

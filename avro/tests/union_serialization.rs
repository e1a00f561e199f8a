use avro_direct::{
    AvroCodec, AvroDecode, AvroEncode, AvroResult, Decoder, Encoder, RecordAccess,
    decode::required,
    schema::SchemaGraph,
    shape::{ShapeField, TargetShape},
};
use std::{io::Write, sync::LazyLock};

#[derive(Clone, PartialEq, Debug)]
struct Root {
    field_union: Enum,
    field_f: String,
}

#[derive(Clone, PartialEq, Debug)]
enum Enum {
    A {},
    B {},
    C {
        field_a: i64,
        field_b: Option<String>,
    },
    D {
        field_a: f32,
        field_b: i32,
    },
}

fn shape(name: &str, fields: &[&str]) -> TargetShape {
    TargetShape::builder()
        .name(name)
        .fields(
            fields
                .iter()
                .map(|f| ShapeField::builder().name(*f).build())
                .collect(),
        )
        .build()
}

static ROOT: LazyLock<TargetShape> = LazyLock::new(|| shape("Root", &["field_union", "field_f"]));
static SHAPE_A: LazyLock<TargetShape> = LazyLock::new(|| shape("A", &[]));
static SHAPE_B: LazyLock<TargetShape> = LazyLock::new(|| shape("B", &[]));
static SHAPE_C: LazyLock<TargetShape> = LazyLock::new(|| shape("C", &["field_a", "field_b"]));
static SHAPE_D: LazyLock<TargetShape> = LazyLock::new(|| shape("D", &["field_a", "field_b"]));

impl AvroEncode for Root {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_record(&ROOT, |record| {
            record.field(0, &self.field_union)?;
            record.field(1, &self.field_f)
        })
    }
}

impl AvroDecode for Root {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_record(&ROOT, |record| {
            let (mut field_union, mut field_f) = (None, None);
            while let Some(index) = record.next_field()? {
                match index {
                    0 => field_union = Some(record.field_value()?),
                    _ => field_f = Some(record.field_value()?),
                }
            }
            Ok(Root {
                field_union: required(field_union, &ROOT, 0)?,
                field_f: required(field_f, &ROOT, 1)?,
            })
        })
    }
}

impl AvroEncode for Enum {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        match self {
            Enum::A {} => encoder.encode_record(&SHAPE_A, |_| Ok(())),
            Enum::B {} => encoder.encode_record(&SHAPE_B, |_| Ok(())),
            Enum::C { field_a, field_b } => encoder.encode_record(&SHAPE_C, |record| {
                record.field(0, field_a)?;
                record.field(1, field_b)
            }),
            Enum::D { field_a, field_b } => encoder.encode_record(&SHAPE_D, |record| {
                record.field(0, field_a)?;
                record.field(1, field_b)
            }),
        }
    }
}

fn decode_pair<D, X, Y>(decoder: D, shape: &'static TargetShape) -> AvroResult<(X, Y)>
where
    D: Decoder,
    X: AvroDecode,
    Y: AvroDecode,
{
    decoder.decode_record(shape, |record| {
        let (mut x, mut y) = (None, None);
        while let Some(index) = record.next_field()? {
            match index {
                0 => x = Some(record.field_value()?),
                _ => y = Some(record.field_value()?),
            }
        }
        Ok((required(x, shape, 0)?, required(y, shape, 1)?))
    })
}

impl AvroDecode for Enum {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        let (index, decoder) = decoder.decode_variant(&["A", "B", "C", "D"])?;
        match index {
            0 => decoder.decode_record(&SHAPE_A, |_| Ok(Enum::A {})),
            1 => decoder.decode_record(&SHAPE_B, |_| Ok(Enum::B {})),
            2 => decode_pair(decoder, &SHAPE_C).map(|(field_a, field_b)| Enum::C { field_a, field_b }),
            _ => decode_pair(decoder, &SHAPE_D).map(|(field_a, field_b)| Enum::D { field_a, field_b }),
        }
    }
}

const SCHEMA_STR: &str = r#"{
    "name": "Root",
    "type": "record",
    "fields": [
        {"name": "field_union", "type": [
            {
                "name": "A",
                "type": "record",
                "fields": []
            },
            {
                "name": "B",
                "type": "record",
                "fields": []
            },
            {
                "name": "C",
                "type": "record",
                "fields": [
                    {"name": "field_a", "type": "long"},
                    {"name": "field_b", "type": ["null", "string"]}
                ]
            },
            {
                "name": "D",
                "type": "record",
                "fields": [
                    {"name": "field_a", "type": "float"},
                    {"name": "field_b", "type": "int"}
                ]
            }
        ]},
        {"name": "field_f", "type": "string"}
    ]
}"#;

fn round_trip(codec: &AvroCodec, input: Root, expected_bytes: &[u8]) -> AvroResult<()> {
    let encoded = codec.encode_to_vec(&input)?;
    assert_eq!(encoded, expected_bytes);

    let output: Root = codec.decode_slice(&encoded)?;
    assert_eq!(input, output);
    Ok(())
}

#[test]
fn test_union_variants_serialization() -> AvroResult<()> {
    let codec = AvroCodec::new(SchemaGraph::parse_str(SCHEMA_STR)?);

    // Test variant 0
    {
        let input = Root {
            field_union: Enum::A {},
            field_f: "test1".to_owned(),
        };

        #[rustfmt::skip]
        let expected_bytes: [u8; 7] = [
            // Root {
                // field_union:
                    0x00, // variant 0 (Enum::A) {
                    // }
                // field_f:
                    0x0A, // string length = 5
                    0x74, 0x65, 0x73, 0x74, 0x31, // UTF-8 string "test1"
            // }
        ];

        round_trip(&codec, input, &expected_bytes)?;
    }

    // Test variant 1
    {
        let input = Root {
            field_union: Enum::B {},
            field_f: "test2".to_owned(),
        };

        #[rustfmt::skip]
        let expected_bytes: [u8; 7] = [
            0x02, // variant 1 (Enum::B) {}
            0x0A, 0x74, 0x65, 0x73, 0x74, 0x32, // "test2"
        ];

        round_trip(&codec, input, &expected_bytes)?;
    }

    // Test variant 2
    {
        let input = Root {
            field_union: Enum::C {
                field_a: 3,
                field_b: Some("test3".to_owned()),
            },
            field_f: "test4".to_owned(),
        };

        #[rustfmt::skip]
        let expected_bytes: [u8; 15] = [
            // Root {
                // field_union:
                    0x04, // variant 2 (Enum::C) {
                        // field_a:
                            0x06, // 3
                        // field_b:
                            0x02, // variant 1 (Some) {
                                0x0A, // string length = 5
                                0x74, 0x65, 0x73, 0x74, 0x33, // UTF-8 string "test3"
                            // }
                    // }
                // field_f:
                    0x0A, // string length = 5
                    0x74, 0x65, 0x73, 0x74, 0x34, // UTF-8 string "test4"
            // }
        ];

        round_trip(&codec, input, &expected_bytes)?;
    }

    // Test variant 3
    {
        let input = Root {
            field_union: Enum::D {
                field_a: 0.0,
                field_b: 4,
            },
            field_f: "test5".to_owned(),
        };

        #[rustfmt::skip]
        let expected_bytes: [u8; 12] = [
            0x06, // variant 3 (Enum::D) {
                0x00, 0x00, 0x00, 0x00, // 0.0
                0x08, // 4
            // }
            0x0A, 0x74, 0x65, 0x73, 0x74, 0x35, // "test5"
        ];

        round_trip(&codec, input, &expected_bytes)?;
    }

    Ok(())
}

#[test]
fn test_unknown_branch_is_reported() -> AvroResult<()> {
    let codec = AvroCodec::new(SchemaGraph::parse_str(
        r#"{"name": "Root", "type": "record", "fields": [
            {"name": "field_union", "type": [
                {"name": "E", "type": "record", "fields": []},
                {"name": "A", "type": "record", "fields": []}
            ]},
            {"name": "field_f", "type": "string"}
        ]}"#,
    )?);

    let error = codec
        .decode_slice::<Root>(&[0x00, 0x00])
        .expect_err("E is not a variant of Enum");
    assert!(
        error.to_string().contains("field_union"),
        "unexpected error: {error}"
    );
    Ok(())
}

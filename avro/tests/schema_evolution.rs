// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use avro_direct::{
    AvroCodec, AvroDecode, AvroEncode, AvroResult, Decoder, Encoder, RecordAccess,
    decode::required,
    error::{Details, ErrorCategory},
    resolution::{DecodingStep, EncodingWorkflow},
    schema::SchemaGraph,
    shape::{ShapeField, TargetShape},
    types::Value,
};
use pretty_assertions::assert_eq;
use std::{io::Write, sync::LazyLock};

type TestResult = anyhow::Result<()>;

/// Target type with the fields `a: i32` and `c: i64`.
#[derive(Debug, PartialEq)]
struct Ac {
    a: i32,
    c: i64,
}

static AC: LazyLock<TargetShape> = LazyLock::new(|| {
    TargetShape::builder()
        .name("R")
        .fields(vec![
            ShapeField::builder().name("a").build(),
            ShapeField::builder().name("c").build(),
        ])
        .build()
});

impl AvroEncode for Ac {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_record(&AC, |record| {
            record.field(0, &self.a)?;
            record.field(1, &self.c)
        })
    }
}

impl AvroDecode for Ac {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_record(&AC, |record| {
            let (mut a, mut c) = (None, None);
            while let Some(index) = record.next_field()? {
                match index {
                    0 => a = Some(record.field_value()?),
                    _ => c = Some(record.field_value()?),
                }
            }
            Ok(Ac {
                a: required(a, &AC, 0)?,
                c: required(c, &AC, 1)?,
            })
        })
    }
}

/// Target type with `a: i32` and `d: i32`, where `d` defaults to 5.
#[derive(Debug, PartialEq)]
struct Ad {
    a: i32,
    d: i32,
}

static AD: LazyLock<TargetShape> = LazyLock::new(|| {
    TargetShape::builder()
        .name("R")
        .fields(vec![
            ShapeField::builder().name("a").build(),
            ShapeField::builder().name("d").default(Value::Int(5)).build(),
        ])
        .build()
});

impl AvroDecode for Ad {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_record(&AD, |record| {
            let (mut a, mut d) = (None, None);
            while let Some(index) = record.next_field()? {
                match index {
                    0 => a = Some(record.field_value()?),
                    _ => d = Some(record.field_value()?),
                }
            }
            Ok(Ad {
                a: required(a, &AD, 0)?,
                d: required(d, &AD, 1)?,
            })
        })
    }
}

/// Target type with `a: i32` and a required `e: i32`.
#[derive(Debug)]
struct Ae;

static AE: LazyLock<TargetShape> = LazyLock::new(|| {
    TargetShape::builder()
        .name("R")
        .fields(vec![
            ShapeField::builder().name("a").build(),
            ShapeField::builder().name("e").build(),
        ])
        .build()
});

impl AvroDecode for Ae {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_record(&AE, |record| {
            while record.next_field()?.is_some() {
                record.field_value::<i32>()?;
            }
            Ok(Ae)
        })
    }
}

const WRITER_ABC: &str = r#"{"type": "record", "name": "R", "fields": [
    {"name": "a", "type": "int"},
    {"name": "b", "type": "string", "default": "x"},
    {"name": "c", "type": "long"}
]}"#;

#[test]
fn contiguous_skip_plan() -> TestResult {
    let codec = AvroCodec::new(SchemaGraph::parse_str(WRITER_ABC)?);
    let plan = codec.plan(&AC)?;

    assert_eq!(
        plan.encoding_workflow(),
        &EncodingWorkflow::ContiguousWithSkips {
            skip_mask: vec![false, false],
            writer_defaults: vec![false, true, false],
        }
    );
    let steps: Vec<_> = plan
        .decoding_steps()
        .iter()
        .map(|step| match step {
            DecodingStep::DeserializeWriterField { target_index, .. } => format!("deserialize {target_index}"),
            DecodingStep::SkipWriterField { writer_index, .. } => format!("skip {writer_index}"),
            other => format!("{other:?}"),
        })
        .collect();
    assert_eq!(steps, ["deserialize 0", "skip 1", "deserialize 1"]);
    Ok(())
}

#[test]
fn contiguous_skip_round_trip() -> TestResult {
    let codec = AvroCodec::new(SchemaGraph::parse_str(WRITER_ABC)?);

    // The writer default of `b` is written in its place.
    let bytes = codec.encode_to_vec(&Ac { a: 1, c: 3 })?;
    assert_eq!(bytes, [0x02, 0x02, b'x', 0x06]);

    // Whatever the writer put in `b` is skipped.
    let written_by_other = [0x02, 0x06, b'a', b'b', b'c', 0x06];
    assert_eq!(codec.decode_slice::<Ac>(&written_by_other)?, Ac { a: 1, c: 3 });
    Ok(())
}

#[test]
fn writer_field_without_default_blocks_encoding_only() -> TestResult {
    let codec = AvroCodec::new(SchemaGraph::parse_str(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "int"},
            {"name": "b", "type": "string"},
            {"name": "c", "type": "long"}
        ]}"#,
    )?);

    let error = codec
        .encode_to_vec(&Ac { a: 1, c: 3 })
        .expect_err("b has neither a value nor a default");
    match error.into_details() {
        Details::MissingWriterFields { fields, .. } => assert_eq!(fields, ["b"]),
        other => panic!("Expected MissingWriterFields, got {other:?}"),
    }

    assert_eq!(
        codec.decode_slice::<Ac>(&[0x02, 0x02, b'z', 0x06])?,
        Ac { a: 1, c: 3 }
    );
    Ok(())
}

#[test]
fn default_injection_reads_nothing() -> TestResult {
    let codec = AvroCodec::new(SchemaGraph::parse_str(
        r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
    )?);

    let plan = codec.plan(&AD)?;
    assert!(matches!(
        plan.decoding_steps(),
        [
            DecodingStep::DeserializeWriterField { target_index: 0, .. },
            DecodingStep::GetDefaultValue {
                target_index: 1,
                default: Value::Int(5)
            }
        ]
    ));

    // `decode_slice` fails if a single byte is left over or missing.
    assert_eq!(codec.decode_slice::<Ad>(&[0x02])?, Ad { a: 1, d: 5 });
    Ok(())
}

#[test]
fn missing_required_field_fails_before_reading() -> TestResult {
    let codec = AvroCodec::new(SchemaGraph::parse_str(
        r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
    )?);

    // No bytes at all: a read would fail with a truncation instead.
    let error = codec.decode_slice::<Ae>(&[]).expect_err("e cannot be produced");
    assert_eq!(error.category(), ErrorCategory::SchemaResolution);
    match error.into_details() {
        Details::MissingRequiredField {
            field,
            target_index,
            ..
        } => {
            assert_eq!(field, "e");
            assert_eq!(target_index, 1);
        }
        other => panic!("Expected MissingRequiredField, got {other:?}"),
    }
    Ok(())
}

#[test]
fn renamed_field_matches_by_alias() -> TestResult {
    static RENAMED: LazyLock<TargetShape> = LazyLock::new(|| {
        TargetShape::builder()
            .name("R")
            .fields(vec![
                ShapeField::builder()
                    .name("new")
                    .aliases(vec!["old".to_string()])
                    .build(),
            ])
            .build()
    });

    let codec = AvroCodec::new(SchemaGraph::parse_str(
        r#"{"type": "record", "name": "R", "fields": [{"name": "old", "type": "string"}]}"#,
    )?);
    let plan = codec.plan(&RENAMED)?;
    assert_eq!(plan.encoding_workflow(), &EncodingWorkflow::ExactMatch);
    assert_eq!(plan.writer_index(0), Some(0));
    Ok(())
}

#[test]
fn reordered_fields_are_written_in_writer_order() -> TestResult {
    let codec = AvroCodec::new(SchemaGraph::parse_str(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "c", "type": "long"},
            {"name": "a", "type": "int"}
        ]}"#,
    )?);
    assert!(matches!(
        codec.plan(&AC)?.encoding_workflow(),
        EncodingWorkflow::NonContiguous { .. }
    ));

    let value = Ac { a: 1, c: -1 };
    let bytes = codec.encode_to_vec(&value)?;
    assert_eq!(bytes, [0x01, 0x02]);
    assert_eq!(codec.decode_slice::<Ac>(&bytes)?, value);
    Ok(())
}

#[test]
fn int_writer_is_read_as_long() -> TestResult {
    let codec = AvroCodec::new(SchemaGraph::parse_str(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "int"},
            {"name": "c", "type": "int"}
        ]}"#,
    )?);
    assert_eq!(codec.decode_slice::<Ac>(&[0x02, 0x03])?, Ac { a: 1, c: -2 });
    Ok(())
}

#[test]
fn unknown_complex_fields_are_skipped() -> TestResult {
    let codec = AvroCodec::new(SchemaGraph::parse_str(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "tags", "type": {"type": "map", "values": {"type": "array", "items": "string"}}},
            {"name": "a", "type": "int"},
            {"name": "inner", "type": {"type": "record", "name": "Inner", "fields": [
                {"name": "flag", "type": "boolean"},
                {"name": "maybe", "type": ["null", "double"]}
            ]}},
            {"name": "c", "type": "long"}
        ]}"#,
    )?);

    #[rustfmt::skip]
    let bytes = [
        // tags: {"k": ["v"]}
        0x02, 0x02, b'k', 0x02, 0x02, b'v', 0x00, 0x00,
        // a
        0x02,
        // inner: {flag: true, maybe: 1.0}
        0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF0, 0x3F,
        // c
        0x06,
    ];
    assert_eq!(codec.decode_slice::<Ac>(&bytes)?, Ac { a: 1, c: 3 });
    Ok(())
}

/// A shape field the type fills on its own is neither read nor required.
#[test]
fn builtin_default_is_left_to_the_type() -> TestResult {
    #[derive(Debug, PartialEq)]
    struct Counted {
        a: i32,
        count: u32,
    }

    static COUNTED: LazyLock<TargetShape> = LazyLock::new(|| {
        TargetShape::builder()
            .name("R")
            .fields(vec![
                ShapeField::builder().name("a").build(),
                ShapeField::builder()
                    .name("count")
                    .has_builtin_default(true)
                    .build(),
            ])
            .build()
    });

    impl AvroDecode for Counted {
        fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
            decoder.decode_record(&COUNTED, |record| {
                let (mut a, mut count) = (None, None);
                while let Some(index) = record.next_field()? {
                    match index {
                        0 => a = Some(record.field_value()?),
                        _ => count = Some(record.field_value()?),
                    }
                }
                Ok(Counted {
                    a: required(a, &COUNTED, 0)?,
                    count: count.unwrap_or_default(),
                })
            })
        }
    }

    let codec = AvroCodec::new(SchemaGraph::parse_str(
        r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
    )?);
    assert_eq!(
        codec.decode_slice::<Counted>(&[0x04])?,
        Counted { a: 2, count: 0 }
    );
    Ok(())
}

/// A field that holds either an int or a string.
#[derive(Debug, PartialEq)]
enum IntOrText {
    Int(i32),
    Text(String),
}

impl AvroDecode for IntOrText {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        let (index, decoder) = decoder.decode_variant(&["int", "string"])?;
        match index {
            0 => decoder.decode_int().map(IntOrText::Int),
            _ => decoder.decode_string().map(IntOrText::Text),
        }
    }
}

#[derive(Debug, PartialEq)]
struct Au {
    a: i32,
    u: IntOrText,
}

static AU: LazyLock<TargetShape> = LazyLock::new(|| {
    TargetShape::builder()
        .name("R")
        .fields(vec![
            ShapeField::builder().name("a").build(),
            ShapeField::builder()
                .name("u")
                .default(Value::String("x".to_string()))
                .build(),
        ])
        .build()
});

impl AvroDecode for Au {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_record(&AU, |record| {
            let (mut a, mut u) = (None, None);
            while let Some(index) = record.next_field()? {
                match index {
                    0 => a = Some(record.field_value()?),
                    _ => u = Some(record.field_value()?),
                }
            }
            Ok(Au {
                a: required(a, &AU, 0)?,
                u: required(u, &AU, 1)?,
            })
        })
    }
}

#[test]
fn union_default_picks_the_variant_of_its_kind() -> TestResult {
    let codec = AvroCodec::new(SchemaGraph::parse_str(
        r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
    )?);
    assert_eq!(
        codec.decode_slice::<Au>(&[0x02])?,
        Au {
            a: 1,
            u: IntOrText::Text("x".to_string())
        }
    );
    Ok(())
}

//! Integration tests for jsonschema-reflect: generated documents validate
//! real instances.

use std::collections::HashMap;

use expect_test::expect;
use jsonschema_reflect::{Kind, Reflect, Reflector, TypeDescriptor};
use serde_json::{Value, json};

pub struct Timestamp;

impl Reflect for Timestamp {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::anonymous::<Timestamp>(Kind::Format("date-time"))
    }
}

#[derive(Reflect)]
pub struct SampleUser {
    #[reflect(tag = r#"json:"id""#)]
    pub id: i64,
    #[reflect(
        tag = r#"json:"name" jsonschema:"title=the name,description=The name of a friend,example=joe,example=lucy,default=alex""#
    )]
    pub name: String,
    #[reflect(tag = r#"json:"friends,omitempty" jsonschema_description:"The list of IDs, omitted when empty""#)]
    pub friends: Vec<i64>,
    #[reflect(tag = r#"json:"tags,omitempty" jsonschema_extras:"a=b,foo=bar,foo=bar1""#)]
    pub tags: HashMap<String, Value>,
    #[reflect(tag = r#"json:"birth_date,omitempty" jsonschema:"oneof_required=date""#)]
    pub birth_date: Timestamp,
    #[reflect(tag = r#"json:"year_of_birth,omitempty" jsonschema:"oneof_required=year""#)]
    pub year_of_birth: String,
    #[reflect(tag = r#"json:"metadata,omitempty" jsonschema:"oneof_type=string;array""#)]
    pub metadata: Value,
    #[reflect(tag = r#"json:"fav_color,omitempty" jsonschema:"enum=red,enum=green,enum=blue""#)]
    pub favorite_color: String,
}

fn sample_document() -> Value {
    let schema = Reflector::new()
        .reflect::<SampleUser>()
        .expect("Should reflect SampleUser");
    serde_json::to_value(&schema).expect("Should serialize schema")
}

#[test]
fn sample_user_document() {
    let schema = Reflector::new()
        .reflect::<SampleUser>()
        .expect("Should reflect SampleUser");
    let rendered = serde_json::to_string_pretty(&schema).expect("Should serialize schema");
    expect![[r##"
        {
          "$schema": "https://json-schema.org/draft/2020-12/schema",
          "$ref": "#/$defs/SampleUser",
          "$defs": {
            "SampleUser": {
              "oneOf": [
                {
                  "required": [
                    "birth_date"
                  ],
                  "title": "date"
                },
                {
                  "required": [
                    "year_of_birth"
                  ],
                  "title": "year"
                }
              ],
              "properties": {
                "id": {
                  "type": "integer"
                },
                "name": {
                  "type": "string",
                  "title": "the name",
                  "description": "The name of a friend",
                  "default": "alex",
                  "examples": [
                    "joe",
                    "lucy"
                  ]
                },
                "friends": {
                  "items": {
                    "type": "integer"
                  },
                  "type": "array",
                  "description": "The list of IDs, omitted when empty"
                },
                "tags": {
                  "type": "object",
                  "a": "b",
                  "foo": [
                    "bar",
                    "bar1"
                  ]
                },
                "birth_date": {
                  "type": "string",
                  "format": "date-time"
                },
                "year_of_birth": {
                  "type": "string"
                },
                "metadata": {
                  "oneOf": [
                    {
                      "type": "string"
                    },
                    {
                      "type": "array"
                    }
                  ]
                },
                "fav_color": {
                  "type": "string",
                  "enum": [
                    "red",
                    "green",
                    "blue"
                  ]
                }
              },
              "additionalProperties": false,
              "type": "object",
              "required": [
                "id",
                "name"
              ]
            }
          }
        }"##]]
    .assert_eq(&rendered);
}

#[test]
fn sample_user_accepts_valid_instances() {
    let document = sample_document();
    let validator = jsonschema::validator_for(&document).expect("Should compile schema");

    let valid = [
        json!({"id": 1, "name": "joe", "birth_date": "2020-01-01T00:00:00Z"}),
        json!({
            "id": 2,
            "name": "lucy",
            "year_of_birth": "1990",
            "friends": [1, 3],
            "metadata": ["a"],
            "fav_color": "green",
            "tags": {"team": "blue"}
        }),
    ];
    for instance in &valid {
        assert!(validator.is_valid(instance), "Should accept {instance}");
    }
}

#[test]
fn sample_user_rejects_invalid_instances() {
    let document = sample_document();
    let validator = jsonschema::validator_for(&document).expect("Should compile schema");

    let invalid = [
        // missing name
        json!({"id": 1, "birth_date": "2020-01-01T00:00:00Z"}),
        // both alternatives
        json!({"id": 1, "name": "joe", "birth_date": "x", "year_of_birth": "1990"}),
        // neither alternative
        json!({"id": 1, "name": "joe"}),
        json!({"id": 1, "name": "joe", "year_of_birth": "1990", "nickname": "jo"}),
        json!({"id": 1, "name": "joe", "year_of_birth": "1990", "fav_color": "purple"}),
        json!({"id": "1", "name": "joe", "year_of_birth": "1990"}),
        json!({"id": 1, "name": "joe", "year_of_birth": "1990", "metadata": 5}),
    ];
    for instance in &invalid {
        assert!(!validator.is_valid(instance), "Should reject {instance}");
    }
}

#[derive(Reflect)]
pub struct Category {
    #[reflect(tag = r#"json:"label" jsonschema:"minLength=1""#)]
    pub label: String,
    #[reflect(tag = r#"json:"children,omitempty""#)]
    pub children: Vec<Category>,
    #[reflect(tag = r#"json:"weights,omitempty" jsonschema:"minimum=0""#)]
    pub weights: Vec<u32>,
    #[reflect(tag = r#"json:"span,omitempty""#)]
    pub span: Option<(u32, u32)>,
}

#[test]
fn recursive_documents_validate_nested_instances() {
    for reflector in [
        Reflector::new(),
        Reflector::new().expanded_struct(true),
        Reflector::new().do_not_reference(true),
    ] {
        let schema = reflector.reflect::<Category>().expect("Should reflect Category");
        let document = serde_json::to_value(&schema).expect("Should serialize schema");
        let validator = jsonschema::validator_for(&document).expect("Should compile schema");

        let tree = json!({
            "label": "root",
            "children": [
                {"label": "leaf", "weights": [1, 2], "span": [0, 4]},
                {"label": "branch", "children": [{"label": "deep"}]}
            ]
        });
        assert!(validator.is_valid(&tree), "Should accept {tree}");

        let bad_leaf = json!({"label": "root", "children": [{"label": ""}]});
        assert!(!validator.is_valid(&bad_leaf), "Should reject {bad_leaf}");

        let bad_span = json!({"label": "root", "span": [1, 2, 3]});
        assert!(!validator.is_valid(&bad_span), "Should reject {bad_span}");
    }
}

//! The schema node emitted by the walker.
//!
//! Field order matches the order keywords are written in; serialization is
//! deterministic for a given node.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Number, Value};

use crate::id::Id;

/// Draft 2020-12 meta-schema URI written as `$schema`.
pub const VERSION: &str = "https://json-schema.org/draft/2020-12/schema";

/// Ordered map of definition name to schema (`$defs`).
pub type Definitions = IndexMap<String, Schema>;

/// Ordered map of property name to schema.
pub type Properties = IndexMap<String, Schema>;

/// The `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl SchemaType {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Null => "null",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown schema type `{0}`")]
pub struct UnknownSchemaType(pub String);

impl FromStr for SchemaType {
    type Err = UnknownSchemaType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "object" => Ok(SchemaType::Object),
            "array" => Ok(SchemaType::Array),
            "string" => Ok(SchemaType::String),
            "integer" => Ok(SchemaType::Integer),
            "number" => Ok(SchemaType::Number),
            "boolean" => Ok(SchemaType::Boolean),
            "null" => Ok(SchemaType::Null),
            other => Err(UnknownSchemaType(other.to_string())),
        }
    }
}

/// A JSON Schema node, or one of the boolean schemas `true` / `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    // core
    pub version: Option<String>,
    pub id: Option<Id>,
    pub anchor: Option<String>,
    pub reference: Option<String>,
    pub dynamic_reference: Option<String>,
    pub definitions: Definitions,
    pub comment: Option<String>,

    // applicators
    pub all_of: Vec<Schema>,
    pub any_of: Vec<Schema>,
    pub one_of: Vec<Schema>,
    pub not: Option<Box<Schema>>,
    pub if_schema: Option<Box<Schema>>,
    pub then_schema: Option<Box<Schema>>,
    pub else_schema: Option<Box<Schema>>,
    pub dependent_schemas: IndexMap<String, Schema>,
    pub prefix_items: Vec<Schema>,
    pub items: Option<Box<Schema>>,
    pub contains: Option<Box<Schema>>,
    pub properties: Option<Properties>,
    pub pattern_properties: IndexMap<String, Schema>,
    pub additional_properties: Option<Box<Schema>>,
    pub property_names: Option<Box<Schema>>,

    // validation
    pub schema_type: Option<SchemaType>,
    pub enum_values: Vec<Value>,
    pub const_value: Option<Value>,
    pub multiple_of: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
    pub minimum: Option<Number>,
    pub exclusive_minimum: Option<Number>,
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    pub unique_items: bool,
    pub max_contains: Option<u64>,
    pub min_contains: Option<u64>,
    pub max_properties: Option<u64>,
    pub min_properties: Option<u64>,
    pub required: Vec<String>,
    pub dependent_required: IndexMap<String, Vec<String>>,

    // format and content
    pub format: Option<String>,
    pub content_encoding: Option<String>,
    pub content_media_type: Option<String>,
    pub content_schema: Option<Box<Schema>>,

    // meta-data
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub deprecated: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub examples: Vec<Value>,

    /// Passthrough keywords, written after everything else.
    pub extras: IndexMap<String, Value>,

    /// Set only for the `true` and `false` schemas.
    pub(crate) boolean: Option<bool>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The schema that accepts everything, written as `true`.
    pub fn true_schema() -> Self {
        Self {
            boolean: Some(true),
            ..Self::default()
        }
    }

    /// The schema that rejects everything, written as `false`.
    pub fn false_schema() -> Self {
        Self {
            boolean: Some(false),
            ..Self::default()
        }
    }

    pub fn is_true(&self) -> bool {
        self.boolean == Some(true)
    }

    pub fn is_false(&self) -> bool {
        self.boolean == Some(false)
    }

    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Properties map, created empty on first use.
    pub fn properties_mut(&mut self) -> &mut Properties {
        self.properties.get_or_insert_with(Properties::new)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(value) = self.boolean {
            return serializer.serialize_bool(value);
        }

        let mut map = serializer.serialize_map(None)?;
        let mut written: Vec<&'static str> = Vec::new();

        macro_rules! entry {
            ($key:literal, $value:expr) => {{
                map.serialize_entry($key, $value)?;
                written.push($key);
            }};
        }
        macro_rules! optional {
            ($key:literal, $field:expr) => {
                if let Some(value) = &$field {
                    entry!($key, value);
                }
            };
        }
        macro_rules! non_empty {
            ($key:literal, $field:expr) => {
                if !$field.is_empty() {
                    entry!($key, &$field);
                }
            };
        }
        macro_rules! flag {
            ($key:literal, $field:expr) => {
                if $field {
                    entry!($key, &true);
                }
            };
        }

        optional!("$schema", self.version);
        optional!("$id", self.id);
        optional!("$anchor", self.anchor);
        optional!("$ref", self.reference);
        optional!("$dynamicRef", self.dynamic_reference);
        non_empty!("$defs", self.definitions);
        optional!("$comment", self.comment);

        non_empty!("allOf", self.all_of);
        non_empty!("anyOf", self.any_of);
        non_empty!("oneOf", self.one_of);
        optional!("not", self.not);
        optional!("if", self.if_schema);
        optional!("then", self.then_schema);
        optional!("else", self.else_schema);
        non_empty!("dependentSchemas", self.dependent_schemas);
        non_empty!("prefixItems", self.prefix_items);
        optional!("items", self.items);
        optional!("contains", self.contains);
        optional!("properties", self.properties);
        non_empty!("patternProperties", self.pattern_properties);
        optional!("additionalProperties", self.additional_properties);
        optional!("propertyNames", self.property_names);

        optional!("type", self.schema_type);
        non_empty!("enum", self.enum_values);
        optional!("const", self.const_value);
        optional!("multipleOf", self.multiple_of);
        optional!("maximum", self.maximum);
        optional!("exclusiveMaximum", self.exclusive_maximum);
        optional!("minimum", self.minimum);
        optional!("exclusiveMinimum", self.exclusive_minimum);
        optional!("maxLength", self.max_length);
        optional!("minLength", self.min_length);
        optional!("pattern", self.pattern);
        optional!("maxItems", self.max_items);
        optional!("minItems", self.min_items);
        flag!("uniqueItems", self.unique_items);
        optional!("maxContains", self.max_contains);
        optional!("minContains", self.min_contains);
        optional!("maxProperties", self.max_properties);
        optional!("minProperties", self.min_properties);
        non_empty!("required", self.required);
        non_empty!("dependentRequired", self.dependent_required);

        optional!("format", self.format);
        optional!("contentEncoding", self.content_encoding);
        optional!("contentMediaType", self.content_media_type);
        optional!("contentSchema", self.content_schema);

        optional!("title", self.title);
        optional!("description", self.description);
        optional!("default", self.default);
        flag!("deprecated", self.deprecated);
        flag!("readOnly", self.read_only);
        flag!("writeOnly", self.write_only);
        non_empty!("examples", self.examples);

        for (key, value) in &self.extras {
            if !written.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }

        map.end()
    }
}

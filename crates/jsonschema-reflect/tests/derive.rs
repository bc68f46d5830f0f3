use std::collections::BTreeMap;

use jsonschema_reflect::{ExtensionError, Kind, Reflect, Reflector, Schema, SchemaType};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn definition<T: Reflect>(name: &str) -> Value {
    let schema = Reflector::new().reflect::<T>().expect("Should reflect schema");
    let value = serde_json::to_value(&schema).expect("Should serialize schema");
    value["$defs"][name].clone()
}

#[derive(Reflect, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeConfig {
    pub listen_address: String,
    #[serde(rename = "port")]
    pub listen_port: u16,
    #[serde(default)]
    pub worker_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip)]
    pub runtime_handle: u64,
    #[serde(flatten)]
    pub labels: BTreeMap<String, String>,
    #[reflect(tag = r#"json:"timeout_ms,omitempty" jsonschema:"minimum=100""#)]
    pub timeout: u64,
}

#[test]
fn serde_attributes_drive_property_names() {
    let definition = definition::<ServeConfig>("ServeConfig");
    assert_eq!(
        definition,
        json!({
            "properties": {
                "listenAddress": {"type": "string"},
                "port": {"type": "integer"},
                "workerCount": {"type": "integer"},
                "logLevel": {"type": "string"},
                "timeout_ms": {"type": "integer", "minimum": 100}
            },
            "additionalProperties": {"type": "string"},
            "type": "object",
            "required": ["listenAddress", "port"]
        })
    );
}

#[derive(Reflect)]
#[reflect(name = "Point2D")]
pub struct Point(pub f64, pub f64);

#[derive(Reflect)]
#[serde(rename = "Nothing")]
pub struct Marker;

#[derive(Reflect)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Low,
    VeryHigh,
}

#[derive(Reflect)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    ReadOnly,
    ReadWrite,
}

#[test]
fn container_shapes_follow_their_kind() {
    let point = Point::descriptor();
    assert_eq!(point.name, "Point2D");
    assert_eq!(point.module_path, module_path!());
    assert!(matches!(point.kind, Kind::Tuple(ref elements) if elements.len() == 2));

    let marker = Marker::descriptor();
    assert_eq!(marker.name, "Nothing");
    assert!(matches!(marker.kind, Kind::Null));

    assert!(matches!(Level::descriptor().kind, Kind::Enum(ref names) if names == &["LOW", "VERY_HIGH"]));
    assert!(matches!(Mode::descriptor().kind, Kind::Enum(ref names) if names == &["readonly", "readwrite"]));

    assert_eq!(
        definition::<Point>("Point2D"),
        json!({
            "prefixItems": [{"type": "number"}, {"type": "number"}],
            "items": false,
            "type": "array",
            "maxItems": 2,
            "minItems": 2
        })
    );
}

#[derive(Reflect)]
pub struct Page<T> {
    #[reflect(tag = r#"json:"items""#)]
    pub items: Vec<T>,
    #[reflect(tag = r#"json:"next,omitempty""#)]
    pub next: Option<String>,
}

#[derive(Reflect)]
pub struct Entry {
    #[reflect(tag = r#"json:"key""#)]
    pub key: String,
}

#[test]
fn generic_structs_reflect_their_parameters() {
    assert_eq!(
        definition::<Page<Entry>>("Page"),
        json!({
            "properties": {
                "items": {"items": {"$ref": "#/$defs/Entry"}, "type": "array"},
                "next": {"type": "string"}
            },
            "additionalProperties": false,
            "type": "object",
            "required": ["items"]
        })
    );
}

#[derive(Reflect)]
#[reflect(schema_with = "Semver::json_schema")]
pub struct Semver {
    pub major: u32,
    pub minor: u32,
}

impl Semver {
    fn json_schema() -> Result<Schema, ExtensionError> {
        let mut schema = Schema::of_type(SchemaType::String);
        schema.pattern = Some(r"^\d+\.\d+$".to_string());
        Ok(schema)
    }
}

#[derive(Reflect)]
pub struct MinimumVersion(pub Semver);

#[test]
fn newtypes_keep_the_inner_capabilities() {
    let descriptor = MinimumVersion::descriptor();
    assert_eq!(descriptor.name, "MinimumVersion");
    assert!(descriptor.capabilities.schema.is_some());

    assert_eq!(
        definition::<MinimumVersion>("MinimumVersion"),
        json!({"type": "string", "pattern": "^\\d+\\.\\d+$"})
    );
}

//! Integration tests for jsonschema-reflect: type capabilities.

use jsonschema_reflect::{
    Error, ExtensionError, Reflect, Reflector, Schema, SchemaType, TypeDescriptor, VERSION, anyhow,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn schema_json<T: Reflect>(reflector: &Reflector) -> Value {
    let schema = reflector.reflect::<T>().expect("Should reflect schema");
    serde_json::to_value(&schema).expect("Should serialize schema")
}

#[derive(Reflect)]
#[reflect(schema_with = "CompactDate::json_schema")]
pub struct CompactDate {
    pub year: i32,
    pub month: i32,
}

impl CompactDate {
    fn json_schema() -> Result<Schema, ExtensionError> {
        let mut schema = Schema::of_type(SchemaType::String)
            .with_description("Short date that only includes year and month");
        schema.pattern = Some(r"\d{4}-\d{2}".to_string());
        schema.title = Some("Compact Date".to_string());
        Ok(schema)
    }
}

#[derive(Reflect)]
pub struct Calendar {
    #[reflect(tag = r#"json:"start""#)]
    pub start: CompactDate,
    #[reflect(tag = r#"json:"holidays,omitempty""#)]
    pub holidays: Vec<CompactDate>,
}

#[test]
fn custom_schema_replaces_structural_generation() {
    assert_eq!(
        schema_json::<CompactDate>(&Reflector::new()),
        json!({
            "$schema": VERSION,
            "$ref": "#/$defs/CompactDate",
            "$defs": {
                "CompactDate": {
                    "type": "string",
                    "pattern": "\\d{4}-\\d{2}",
                    "title": "Compact Date",
                    "description": "Short date that only includes year and month"
                }
            }
        })
    );
}

#[test]
fn custom_schema_types_are_shared_definitions() {
    let value = schema_json::<Calendar>(&Reflector::new());
    assert_eq!(
        value["$defs"]["Calendar"]["properties"],
        json!({
            "start": {"$ref": "#/$defs/CompactDate"},
            "holidays": {"items": {"$ref": "#/$defs/CompactDate"}, "type": "array"}
        })
    );
    assert_eq!(value["$defs"]["CompactDate"]["type"], json!("string"));
}

#[test]
fn custom_schema_wins_over_ignored_types() {
    let value = schema_json::<Calendar>(&Reflector::new().ignore_type::<CompactDate>());
    assert_eq!(
        value["$defs"]["Calendar"]["properties"]["start"],
        json!({"$ref": "#/$defs/CompactDate"})
    );
    assert_eq!(
        value["$defs"]["CompactDate"]["pattern"],
        json!("\\d{4}-\\d{2}")
    );
}

#[derive(Reflect)]
#[reflect(schema_with = "Broken::json_schema")]
pub struct Broken;

impl Broken {
    fn json_schema() -> Result<Schema, ExtensionError> {
        Err(anyhow::anyhow!("schema source unavailable"))
    }
}

#[test]
fn failing_custom_schema_is_reported() {
    let err = Reflector::new()
        .reflect::<Broken>()
        .expect_err("Should propagate extension error");
    match &err {
        Error::Extension {
            capability,
            type_name,
            source,
        } => {
            assert_eq!(*capability, "custom schema");
            assert_eq!(type_name, "Broken");
            assert_eq!(source.to_string(), "schema source unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[derive(Reflect)]
#[reflect(extend_with = "Profile::extend")]
pub struct Profile {
    #[reflect(tag = r#"json:"first_name""#)]
    pub first_name: String,
    #[reflect(tag = r#"json:"status,omitempty""#)]
    pub status: String,
}

impl Profile {
    fn extend(schema: &mut Schema) -> Result<(), ExtensionError> {
        let properties = schema.properties_mut();
        if let Some(first_name) = properties.get_mut("first_name") {
            first_name.max_length = Some(100);
        }
        if let Some(status) = properties.get_mut("status") {
            status.enum_values = vec![json!("active"), json!("disabled")];
        }
        Ok(())
    }
}

#[test]
fn extend_adjusts_generated_schema() {
    let value = schema_json::<Profile>(&Reflector::new());
    assert_eq!(
        value["$defs"]["Profile"]["properties"],
        json!({
            "first_name": {"type": "string", "maxLength": 100},
            "status": {"type": "string", "enum": ["active", "disabled"]}
        })
    );
}

#[derive(Reflect)]
pub struct AliasTarget {
    #[reflect(tag = r#"json:"value""#)]
    pub value: String,
}

#[derive(Reflect)]
#[reflect(alias = "AliasTarget")]
pub struct AliasSource {
    pub ignored: bool,
}

#[derive(Reflect)]
pub struct AliasHolder {
    #[reflect(tag = r#"json:"item""#)]
    pub item: AliasSource,
    #[reflect(tag = r#"json:"again""#)]
    pub again: AliasSource,
}

#[test]
fn alias_reflects_the_target_type() {
    let value = schema_json::<AliasHolder>(&Reflector::new());
    assert_eq!(
        value["$defs"]["AliasHolder"]["properties"],
        json!({
            "item": {"$ref": "#/$defs/AliasTarget"},
            "again": {"$ref": "#/$defs/AliasTarget"}
        })
    );
    let names: Vec<_> = value["$defs"]
        .as_object()
        .expect("Should have definitions")
        .keys()
        .cloned()
        .collect();
    assert_eq!(names, ["AliasHolder", "AliasTarget"]);
}

#[derive(Reflect)]
#[reflect(alias = "Pong")]
pub struct Ping;

#[derive(Reflect)]
#[reflect(alias = "Ping")]
pub struct Pong;

#[test]
fn alias_cycles_are_rejected() {
    let err = Reflector::new()
        .reflect::<Ping>()
        .expect_err("Should detect alias cycle");
    assert!(matches!(err, Error::AliasCycle { .. }), "{err}");
}

#[derive(Reflect)]
#[reflect(property_alias_with = "Invoice::property_type")]
pub struct Invoice {
    #[reflect(tag = r#"json:"id""#)]
    pub id: String,
    #[reflect(tag = r#"json:"amount" jsonschema:"minimum=0""#)]
    pub amount: String,
}

impl Invoice {
    fn property_type(property: &str) -> Option<TypeDescriptor> {
        match property {
            "amount" => Some(f64::descriptor()),
            _ => None,
        }
    }
}

#[test]
fn property_alias_swaps_field_types() {
    let value = schema_json::<Invoice>(&Reflector::new());
    assert_eq!(
        value["$defs"]["Invoice"]["properties"],
        json!({
            "id": {"type": "string"},
            "amount": {"type": "number", "minimum": 0}
        })
    );
}

#[derive(Reflect)]
#[reflect(field_doc_with = "Manual::field_doc")]
pub struct Manual {
    #[reflect(tag = r#"json:"title" jsonschema_description:"From the tag""#)]
    pub title: String,
    #[reflect(tag = r#"json:"body""#)]
    pub body: String,
    #[reflect(tag = r#"json:"footer""#)]
    pub footer: String,
}

impl Manual {
    fn field_doc(field: &str) -> Option<String> {
        match field {
            "title" | "body" => Some(format!("Documented {field}")),
            "footer" => Some(String::new()),
            _ => None,
        }
    }
}

#[test]
fn field_docs_sit_between_tags_and_comments() {
    let module = module_path!();
    let reflector = Reflector::new()
        .with_comment(format!("{module}::Manual.body"), "From the comments")
        .with_comment(format!("{module}::Manual.footer"), "Footer comment");
    let value = schema_json::<Manual>(&reflector);
    let properties = &value["$defs"]["Manual"]["properties"];
    assert_eq!(properties["title"]["description"], json!("From the tag"));
    assert_eq!(properties["body"]["description"], json!("Documented body"));
    assert_eq!(properties["footer"]["description"], json!("Footer comment"));
}

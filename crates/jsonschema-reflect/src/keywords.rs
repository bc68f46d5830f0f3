//! Applies field tag directives to a generated property schema.
//!
//! Directives are applied in order; later ones overwrite earlier ones for
//! single-valued keywords and accumulate for list-valued ones. A directive
//! whose value does not parse is dropped.

use serde_json::{Number, Value};

use crate::id::{DEFINITIONS_POINTER, Id, json_pointer};
use crate::schema::{Schema, SchemaType};
use crate::tag::{
    DESCRIPTION_KEY, Directive, EXTRAS_KEY, JSONSCHEMA_KEY, StructTag, parse_directives,
    split_on_unescaped_commas,
};

/// Extras whose values are written as numbers when they parse as one.
const NUMERIC_EXTRAS: &[&str] = &[
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "minProperties",
    "maxProperties",
];

/// Facts about the field a tag belongs to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KeywordContext<'a> {
    pub property_name: &'a str,
    /// The field's scalar kind is an unsigned integer.
    pub unsigned: bool,
    /// The sequence element kind is an unsigned integer.
    pub item_unsigned: bool,
    pub reference_root: &'a str,
}

/// Applies `jsonschema_description`, `jsonschema` and `jsonschema_extras`
/// from `tag` to `property`. Required-group directives are recorded on
/// `parent`.
pub(crate) fn apply_field_tags(
    property: &mut Schema,
    parent: &mut Schema,
    tag: &StructTag,
    ctx: &KeywordContext<'_>,
) {
    if let Some(description) = tag.lookup(DESCRIPTION_KEY).filter(|text| !text.is_empty()) {
        property.description = Some(description);
    }

    if let Some(raw) = tag.lookup(JSONSCHEMA_KEY) {
        let directives = parse_directives(&raw);
        generic_keywords(property, parent, &directives, ctx);
        type_keywords(property, &directives, ctx);
    }

    if let Some(raw) = tag.lookup(EXTRAS_KEY) {
        extra_keywords(property, &raw);
    }
}

fn type_keywords(property: &mut Schema, directives: &[Directive], ctx: &KeywordContext<'_>) {
    match property.schema_type {
        Some(SchemaType::String) => string_keywords(property, directives, ctx),
        Some(SchemaType::Integer | SchemaType::Number) => {
            numeric_keywords(property, directives, ctx.unsigned, ctx)
        }
        Some(SchemaType::Boolean) => boolean_keywords(property, directives, ctx),
        Some(SchemaType::Array) => array_keywords(property, directives, ctx),
        _ => {}
    }
}

fn generic_keywords(
    property: &mut Schema,
    parent: &mut Schema,
    directives: &[Directive],
    ctx: &KeywordContext<'_>,
) {
    for directive in directives.iter().filter(|directive| !directive.flag) {
        let value = directive.value.as_str();
        match directive.key.as_str() {
            "title" => property.title = Some(value.to_string()),
            "description" => property.description = Some(value.to_string()),
            "type" => match value.parse::<SchemaType>() {
                Ok(schema_type) => property.schema_type = Some(schema_type),
                Err(_) => dropped(directive, ctx),
            },
            "anchor" => property.anchor = Some(value.to_string()),
            "readOnly" => match parse_bool(value) {
                Some(flag) => property.read_only = flag,
                None => dropped(directive, ctx),
            },
            "writeOnly" => match parse_bool(value) {
                Some(flag) => property.write_only = flag,
                None => dropped(directive, ctx),
            },
            "oneof_required" => add_required_group(&mut parent.one_of, value, ctx.property_name),
            "anyof_required" => add_required_group(&mut parent.any_of, value, ctx.property_name),
            "oneof_ref" => {
                let target = ref_target(property);
                target.reference = None;
                target
                    .one_of
                    .extend(value.split(';').map(|name| Schema::reference(resolve_ref(name, ctx))));
            }
            "anyof_ref" => {
                let target = ref_target(property);
                target.reference = None;
                target
                    .any_of
                    .extend(value.split(';').map(|name| Schema::reference(resolve_ref(name, ctx))));
            }
            "oneof_type" => {
                property.schema_type = None;
                property.one_of.extend(type_alternatives(directive, ctx));
            }
            "anyof_type" => {
                property.schema_type = None;
                property.any_of.extend(type_alternatives(directive, ctx));
            }
            _ => {}
        }
    }
}

/// Adds the property to the alternative titled `group`, creating it on
/// first use.
fn add_required_group(alternatives: &mut Vec<Schema>, group: &str, property_name: &str) {
    let position = alternatives
        .iter()
        .position(|alternative| alternative.title.as_deref() == Some(group));
    let alternative = match position {
        Some(index) => &mut alternatives[index],
        None => {
            alternatives.push(Schema {
                title: Some(group.to_string()),
                ..Schema::default()
            });
            let last = alternatives.len() - 1;
            &mut alternatives[last]
        }
    };
    alternative.required.push(property_name.to_string());
}

/// Reference alternatives on a sequence apply to its items.
fn ref_target(property: &mut Schema) -> &mut Schema {
    match property.items {
        Some(ref mut items) => &mut **items,
        None => property,
    }
}

fn resolve_ref(name: &str, ctx: &KeywordContext<'_>) -> String {
    if name.contains('/') || name.contains('#') {
        return name.to_string();
    }
    if ctx.reference_root == DEFINITIONS_POINTER {
        Id::default().def(name).to_string()
    } else {
        format!("{}{}", ctx.reference_root, json_pointer(name))
    }
}

fn type_alternatives(directive: &Directive, ctx: &KeywordContext<'_>) -> Vec<Schema> {
    directive
        .value
        .split(';')
        .filter_map(|name| match name.parse::<SchemaType>() {
            Ok(schema_type) => Some(Schema::of_type(schema_type)),
            Err(_) => {
                tracing::debug!(
                    property = ctx.property_name,
                    directive = %directive.key,
                    value = name,
                    "dropping unknown type alternative"
                );
                None
            }
        })
        .collect()
}

fn string_keywords(property: &mut Schema, directives: &[Directive], ctx: &KeywordContext<'_>) {
    for directive in directives.iter().filter(|directive| !directive.flag) {
        let value = directive.value.as_str();
        match directive.key.as_str() {
            "minLength" => match value.parse::<u64>() {
                Ok(length) => property.min_length = Some(length),
                Err(_) => dropped(directive, ctx),
            },
            "maxLength" => match value.parse::<u64>() {
                Ok(length) => property.max_length = Some(length),
                Err(_) => dropped(directive, ctx),
            },
            "pattern" => property.pattern = Some(value.to_string()),
            "format" => property.format = Some(value.to_string()),
            "default" => property.default = Some(Value::String(value.to_string())),
            "example" => property.examples.push(Value::String(value.to_string())),
            "enum" => property.enum_values.push(Value::String(value.to_string())),
            _ => {}
        }
    }
}

fn numeric_keywords(
    property: &mut Schema,
    directives: &[Directive],
    unsigned: bool,
    ctx: &KeywordContext<'_>,
) {
    let integer = property.schema_type == Some(SchemaType::Integer);
    let mut legacy_exclusive_maximum = false;
    let mut legacy_exclusive_minimum = false;

    for directive in directives.iter().filter(|directive| !directive.flag) {
        let value = directive.value.as_str();
        let bound = || parse_number(value, integer, unsigned, true);
        let literal = || parse_number(value, integer, unsigned, false);
        let slot = match directive.key.as_str() {
            "multipleOf" => &mut property.multiple_of,
            "minimum" => &mut property.minimum,
            "maximum" => &mut property.maximum,
            "exclusiveMaximum" if value == "true" => {
                legacy_exclusive_maximum = true;
                continue;
            }
            "exclusiveMinimum" if value == "true" => {
                legacy_exclusive_minimum = true;
                continue;
            }
            "exclusiveMaximum" if value == "false" => continue,
            "exclusiveMinimum" if value == "false" => continue,
            "exclusiveMaximum" => &mut property.exclusive_maximum,
            "exclusiveMinimum" => &mut property.exclusive_minimum,
            "default" => {
                match literal() {
                    Some(number) => property.default = Some(Value::Number(number)),
                    None => dropped(directive, ctx),
                }
                continue;
            }
            "example" => {
                match literal() {
                    Some(number) => property.examples.push(Value::Number(number)),
                    None => dropped(directive, ctx),
                }
                continue;
            }
            "enum" => {
                match literal() {
                    Some(number) => property.enum_values.push(Value::Number(number)),
                    None => dropped(directive, ctx),
                }
                continue;
            }
            _ => continue,
        };
        match bound() {
            Some(number) => *slot = Some(number),
            None => dropped(directive, ctx),
        }
    }

    if legacy_exclusive_maximum && property.exclusive_maximum.is_none() {
        property.exclusive_maximum = property.maximum.take();
    }
    if legacy_exclusive_minimum && property.exclusive_minimum.is_none() {
        property.exclusive_minimum = property.minimum.take();
    }
}

fn boolean_keywords(property: &mut Schema, directives: &[Directive], ctx: &KeywordContext<'_>) {
    for directive in directives.iter().filter(|directive| !directive.flag) {
        let target = match directive.key.as_str() {
            "default" | "enum" | "example" => parse_bool(&directive.value),
            _ => continue,
        };
        let Some(flag) = target else {
            dropped(directive, ctx);
            continue;
        };
        match directive.key.as_str() {
            "default" => property.default = Some(Value::Bool(flag)),
            "enum" => property.enum_values.push(Value::Bool(flag)),
            _ => property.examples.push(Value::Bool(flag)),
        }
    }
}

fn array_keywords(property: &mut Schema, directives: &[Directive], ctx: &KeywordContext<'_>) {
    let mut defaults = Vec::new();
    let mut unprocessed = Vec::new();

    for directive in directives {
        let value = directive.value.as_str();
        match directive.key.as_str() {
            "uniqueItems" if directive.flag => property.unique_items = true,
            _ if directive.flag => {}
            "minItems" => match value.parse::<u64>() {
                Ok(count) => property.min_items = Some(count),
                Err(_) => dropped(directive, ctx),
            },
            "maxItems" => match value.parse::<u64>() {
                Ok(count) => property.max_items = Some(count),
                Err(_) => dropped(directive, ctx),
            },
            "uniqueItems" => match parse_bool(value) {
                Some(flag) => property.unique_items = flag,
                None => dropped(directive, ctx),
            },
            "default" => defaults.push(value),
            "format" => {
                if let Some(items) = property.items.as_mut() {
                    items.format = Some(value.to_string());
                }
            }
            "pattern" => {
                if let Some(items) = property.items.as_mut() {
                    items.pattern = Some(value.to_string());
                }
            }
            _ => unprocessed.push(directive.clone()),
        }
    }

    let item_type = property.items.as_ref().and_then(|items| items.schema_type);
    if !defaults.is_empty() {
        let values = defaults
            .into_iter()
            .filter_map(|value| coerce_item(value, item_type, ctx))
            .collect();
        property.default = Some(Value::Array(values));
    }

    if unprocessed.is_empty() {
        return;
    }
    let Some(items) = property.items.as_mut() else {
        return;
    };
    let item_ctx = KeywordContext {
        unsigned: ctx.item_unsigned,
        ..*ctx
    };
    match items.schema_type {
        Some(SchemaType::String) => string_keywords(items, &unprocessed, &item_ctx),
        Some(SchemaType::Integer | SchemaType::Number) => {
            numeric_keywords(items, &unprocessed, ctx.item_unsigned, &item_ctx)
        }
        Some(SchemaType::Boolean) => boolean_keywords(items, &unprocessed, &item_ctx),
        // Nested sequences: where a tag belongs is ambiguous, so leave them alone.
        _ => {}
    }
}

fn coerce_item(value: &str, item_type: Option<SchemaType>, ctx: &KeywordContext<'_>) -> Option<Value> {
    match item_type {
        Some(SchemaType::Integer) => {
            parse_number(value, true, ctx.item_unsigned, false).map(Value::Number)
        }
        Some(SchemaType::Number) => parse_number(value, false, false, false).map(Value::Number),
        Some(SchemaType::Boolean) => parse_bool(value).map(Value::Bool),
        _ => Some(Value::String(value.to_string())),
    }
}

fn extra_keywords(property: &mut Schema, raw: &str) {
    for part in split_on_unescaped_commas(raw) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = coerce_extra(key, value);
        match property.extras.get_mut(key) {
            None => {
                property.extras.insert(key.to_string(), value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
        }
    }
}

fn coerce_extra(key: &str, value: &str) -> Value {
    if let Some(flag) = parse_bool(value) {
        return Value::Bool(flag);
    }
    if NUMERIC_EXTRAS.contains(&key)
        && let Some(number) = parse_number(value, false, false, false)
    {
        return Value::Number(number);
    }
    Value::String(value.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Parses a numeric directive value. Integer schemas only accept integers;
/// with `clamp`, negative values for unsigned fields become zero.
fn parse_number(value: &str, integer: bool, unsigned: bool, clamp: bool) -> Option<Number> {
    let value = value.trim();
    if integer && unsigned {
        if let Ok(number) = value.parse::<u64>() {
            return Some(number.into());
        }
        return match value.parse::<i64>() {
            Ok(number) if number < 0 && clamp => Some(0u64.into()),
            _ => None,
        };
    }
    if let Ok(number) = value.parse::<i64>() {
        return Some(number.into());
    }
    if integer {
        return None;
    }
    value.parse::<f64>().ok().and_then(Number::from_f64)
}

fn dropped(directive: &Directive, ctx: &KeywordContext<'_>) {
    tracing::debug!(
        property = ctx.property_name,
        directive = %directive.key,
        value = %directive.value,
        "dropping malformed jsonschema directive"
    );
}

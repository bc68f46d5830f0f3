//! Walker - turns type descriptors into schema documents.
//!
//! Resolution order for a type: the custom schema capability, the alias
//! capability, the configured mapper, ignored types, then structural
//! generation by kind followed by the extend capability. Named composite
//! types are stored as definitions and referenced; inlined ones are still
//! tracked so a recursive type ends in a `$ref`.

use std::any::TypeId;
use std::collections::HashMap;

use convert_case::{Case, Casing};

use crate::descriptor::{Field, Kind, Reflect, TypeDescriptor};
use crate::error::{Error, Result};
use crate::id::{DEFINITIONS_POINTER, Id, json_pointer};
use crate::keywords::{KeywordContext, apply_field_tags};
use crate::reflector::Reflector;
use crate::registry::{Registry, Status};
use crate::schema::{Properties, Schema, SchemaType, VERSION};
use crate::tag::{JSONSCHEMA_KEY, parse_directives};

/// Pointer chains longer than this are treated as malformed.
const MAX_POINTER_DEPTH: usize = 64;

impl Reflector {
    /// Reflects `T` into a standalone schema document.
    pub fn reflect<T: Reflect>(&self) -> Result<Schema> {
        self.reflect_descriptor(&T::descriptor())
    }

    /// Reflects a descriptor into a standalone schema document.
    #[tracing::instrument(
        name = "jsonschema_reflect.reflect",
        level = "debug",
        skip(self, root),
        fields(root = root.display_name())
    )]
    pub fn reflect_descriptor(&self, root: &TypeDescriptor) -> Result<Schema> {
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(root.id)) {
            tracing::debug!("schema cache hit");
            return Ok(cached);
        }

        if let Some(base) = &self.base_schema_id {
            base.validate().map_err(|reason| Error::InvalidBaseId {
                id: base.to_string(),
                reason,
            })?;
        }

        let resolved = peel_pointers(root.clone())?;
        let inline_root = self.expanded_struct || self.do_not_reference;
        let mut walker = Walker {
            reflector: self,
            registry: Registry::new(),
            inline_root: inline_root.then_some(resolved.id),
            flattening: Vec::new(),
        };

        let mut document = walker.reflect_type(resolved.clone())?.unwrap_or_default();
        if let Some(id) = walker.lookup_id(&resolved)? {
            document.id = Some(id);
        }
        document.version = Some(VERSION.to_string());
        if !self.anonymous
            && document.id.is_none()
            && resolved.is_named()
            && let Some(base) = &self.base_schema_id
        {
            document.id = Some(base.add(&resolved.name.to_case(Case::Kebab)));
        }

        tracing::debug!(definitions = walker.registry.len(), "reflected schema");
        let definitions = walker.registry.into_definitions();
        for (name, definition) in definitions {
            document.definitions.entry(name).or_insert(definition);
        }

        if let Some(cache) = &self.cache {
            cache.insert(root.id, document.clone());
        }
        Ok(document)
    }
}

/// State for one reflection call.
struct Walker<'r> {
    reflector: &'r Reflector,
    registry: Registry,
    /// Root type whose schema is the document itself; references to it are `#`.
    inline_root: Option<TypeId>,
    /// Struct types whose fields are being merged into the current object.
    flattening: Vec<TypeId>,
}

/// How a field participates in its parent.
struct FieldPlan {
    name: String,
    required: bool,
    nullable: bool,
}

enum FieldRole {
    Skip,
    Flatten,
    Property(FieldPlan),
}

impl Walker<'_> {
    /// Schema for a nested type: an external id, a reference to a known
    /// definition, or a freshly reflected schema. `None` when ignored.
    fn walk(&mut self, descriptor: TypeDescriptor) -> Result<Option<Schema>> {
        let descriptor = peel_pointers(descriptor)?;

        if let Some(id) = self.lookup_id(&descriptor)? {
            return Ok(Some(Schema::reference(id.to_string())));
        }

        if let Some(reference) = self.known_reference(descriptor.id) {
            return Ok(Some(reference));
        }

        self.reflect_type(descriptor)
    }

    /// A `$ref` for a type that is being walked or already defined.
    fn known_reference(&mut self, id: TypeId) -> Option<Schema> {
        match self.registry.status(id) {
            Status::InProgress(name) => {
                tracing::trace!(name = %name, "breaking cycle with reference");
                self.registry.mark_cycle_target(id);
                Some(Schema::reference(self.reference_to(id, &name)))
            }
            Status::Defined(name) if !self.reflector.do_not_reference => {
                Some(Schema::reference(self.reference_to(id, &name)))
            }
            _ => None,
        }
    }

    fn reflect_type(&mut self, descriptor: TypeDescriptor) -> Result<Option<Schema>> {
        let mut descriptor = descriptor;
        let mut aliases: Vec<TypeId> = Vec::new();

        loop {
            if let Some(custom) = descriptor.capabilities.schema {
                let schema = custom().map_err(|source| Error::Extension {
                    capability: "custom schema",
                    type_name: descriptor.display_name().to_string(),
                    source,
                })?;
                if !self.promotable(&descriptor) {
                    return Ok(Some(schema));
                }
                let name = self.definition_name(&descriptor);
                return Ok(Some(self.complete_definition(&descriptor, &name, schema)));
            }

            if let Some(alias) = descriptor.capabilities.alias {
                aliases.push(descriptor.id);
                let target = peel_pointers(alias())?;
                if aliases.contains(&target.id) {
                    return Err(Error::AliasCycle {
                        type_name: descriptor.display_name().to_string(),
                    });
                }
                if let Some(reference) = self.known_reference(target.id) {
                    return Ok(Some(reference));
                }
                descriptor = target;
                continue;
            }

            break;
        }

        if let Some(mapper) = &self.reflector.mapper
            && let Some(schema) = mapper(&descriptor)
        {
            return Ok(Some(schema));
        }

        if self.reflector.is_ignored(descriptor.id) {
            return Ok(None);
        }

        self.reflect_structural(&descriptor).map(Some)
    }

    fn reflect_structural(&mut self, descriptor: &TypeDescriptor) -> Result<Schema> {
        let name = if descriptor.is_named() && descriptor.kind.is_composite() {
            let name = self.definition_name(descriptor);
            self.registry.begin(descriptor.id);
            Some(name)
        } else {
            None
        };

        let mut schema = match &descriptor.kind {
            Kind::Bool => Schema::of_type(SchemaType::Boolean),
            Kind::Int | Kind::Uint => Schema::of_type(SchemaType::Integer),
            Kind::Float => Schema::of_type(SchemaType::Number),
            Kind::String => Schema::of_type(SchemaType::String),
            Kind::Bytes => Schema {
                content_encoding: Some("base64".to_string()),
                ..Schema::of_type(SchemaType::String)
            },
            Kind::Null => Schema::of_type(SchemaType::Null),
            Kind::Any => Schema::new(),
            Kind::Format(format) => Schema::of_type(SchemaType::String).with_format(*format),
            Kind::Enum(variants) => Schema {
                enum_values: variants
                    .iter()
                    .map(|variant| serde_json::Value::String(variant.to_string()))
                    .collect(),
                ..Schema::of_type(SchemaType::String)
            },
            Kind::Struct(fields) => self.reflect_struct(descriptor, fields, name.as_deref())?,
            Kind::Sequence {
                element,
                len,
                unique,
            } => {
                let mut schema = Schema::of_type(SchemaType::Array);
                schema.items = self.walk(element())?.map(Box::new);
                if let Some(len) = len {
                    schema.min_items = Some(*len as u64);
                    schema.max_items = Some(*len as u64);
                }
                schema.unique_items = *unique;
                schema
            }
            Kind::Tuple(elements) => {
                let mut schema = Schema::of_type(SchemaType::Array);
                for element in elements {
                    let item = self.walk(element())?.unwrap_or_else(Schema::true_schema);
                    schema.prefix_items.push(item);
                }
                schema.items = Some(Box::new(Schema::false_schema()));
                schema.min_items = Some(elements.len() as u64);
                schema.max_items = Some(elements.len() as u64);
                schema
            }
            Kind::Map { value, .. } => {
                let mut schema = Schema::of_type(SchemaType::Object);
                schema.additional_properties = self.map_values(value())?;
                schema
            }
            Kind::Pointer(inner) => {
                return Ok(self.walk(inner())?.unwrap_or_default());
            }
        };

        if descriptor.kind.is_composite() && schema.description.is_none() {
            schema.description = self.reflector.lookup_comment(descriptor, "");
        }

        if let Some(extend) = descriptor.capabilities.extend {
            extend(&mut schema).map_err(|source| Error::Extension {
                capability: "schema extension",
                type_name: descriptor.display_name().to_string(),
                source,
            })?;
        }

        Ok(match name {
            Some(_)
                if self.reflector.is_inlined(descriptor.id)
                    && self.inline_root != Some(descriptor.id) =>
            {
                self.complete_inline(descriptor.id, schema)
            }
            Some(name) => self.complete_definition(descriptor, &name, schema),
            None => schema,
        })
    }

    /// Schema for map values; `None` leaves the object open.
    fn map_values(&mut self, value: TypeDescriptor) -> Result<Option<Box<Schema>>> {
        let value = peel_pointers(value)?;
        if matches!(value.kind, Kind::Any) {
            return Ok(None);
        }
        Ok(self.walk(value)?.map(Box::new))
    }

    fn reflect_struct(
        &mut self,
        descriptor: &TypeDescriptor,
        fields: &[Field],
        definition_name: Option<&str>,
    ) -> Result<Schema> {
        let mut schema = Schema::of_type(SchemaType::Object);
        schema.properties = Some(Properties::new());
        if self.reflector.assign_anchor && descriptor.is_named() {
            let anchor = definition_name.unwrap_or(descriptor.name);
            schema.anchor = Some(anchor.to_string());
        }
        if !self.reflector.allow_additional_properties {
            schema.additional_properties = Some(Box::new(Schema::false_schema()));
        }

        let outer = std::mem::replace(&mut self.flattening, vec![descriptor.id]);
        let mut depths = HashMap::new();
        self.reflect_fields(descriptor, fields, &mut schema, &mut depths, 0)?;

        if let Some(provider) = self.reflector.additional_fields.clone() {
            let extra = provider(descriptor);
            self.reflect_fields(descriptor, &extra, &mut schema, &mut depths, 0)?;
        }
        self.flattening = outer;

        Ok(schema)
    }

    /// Adds `fields` of `owner` to `schema`. Embedded structs are flattened
    /// one level deeper; a property from a shallower level is never
    /// replaced by a deeper one.
    fn reflect_fields(
        &mut self,
        owner: &TypeDescriptor,
        fields: &[Field],
        schema: &mut Schema,
        depths: &mut HashMap<String, usize>,
        depth: usize,
    ) -> Result<()> {
        for field in fields {
            let plan = match self.field_role(field)? {
                FieldRole::Skip => continue,
                FieldRole::Flatten => {
                    self.flatten_field(field, schema, depths, depth)?;
                    continue;
                }
                FieldRole::Property(plan) => plan,
            };

            if depths.get(&plan.name).is_some_and(|existing| *existing < depth) {
                continue;
            }

            let field_type = owner
                .capabilities
                .property_alias
                .and_then(|alias| alias(&plan.name))
                .unwrap_or_else(|| field.descriptor());
            let field_type = peel_pointers(field_type)?;
            let unsigned = matches!(field_type.kind, Kind::Uint);
            let item_unsigned = element_is_unsigned(&field_type);

            let Some(mut property) = self.walk(field_type)? else {
                continue;
            };

            if let Some(text) = self.reflector.lookup_comment(owner, field.name) {
                property.description = Some(text);
            }
            if let Some(field_doc) = owner.capabilities.field_doc
                && let Some(text) = field_doc(field.name).filter(|text| !text.is_empty())
            {
                property.description = Some(text);
            }

            let ctx = KeywordContext {
                property_name: &plan.name,
                unsigned,
                item_unsigned,
                reference_root: self.reflector.reference_root(),
            };
            apply_field_tags(&mut property, schema, &field.tag, &ctx);

            if plan.nullable {
                property = Schema {
                    one_of: vec![property, Schema::of_type(SchemaType::Null)],
                    ..Schema::default()
                };
            }

            if depths.insert(plan.name.clone(), depth).is_some() {
                schema.required.retain(|required| *required != plan.name);
            }
            if plan.required {
                schema.required.push(plan.name.clone());
            }
            schema.properties_mut().insert(plan.name, property);
        }
        Ok(())
    }

    /// Merges an embedded field into the parent: struct fields become
    /// parent properties, a map's values become the parent's
    /// `additionalProperties`. A struct already being merged into the same
    /// object contributes nothing the second time.
    fn flatten_field(
        &mut self,
        field: &Field,
        schema: &mut Schema,
        depths: &mut HashMap<String, usize>,
        depth: usize,
    ) -> Result<()> {
        let embedded = peel_pointers(field.descriptor())?;
        if self.reflector.is_ignored(embedded.id) {
            return Ok(());
        }
        match &embedded.kind {
            Kind::Struct(fields) => {
                if self.flattening.contains(&embedded.id) {
                    tracing::trace!(name = embedded.display_name(), "skipping recursive embedding");
                    return Ok(());
                }
                self.flattening.push(embedded.id);
                self.reflect_fields(&embedded, fields, schema, depths, depth + 1)?;
                self.flattening.pop();
            }
            Kind::Map { value, .. } => {
                schema.additional_properties = self.map_values(value())?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Decides whether a field is skipped, flattened, or a named property.
    fn field_role(&self, field: &Field) -> Result<FieldRole> {
        let name_tag = field.tag.get(self.reflector.field_name_tag());
        let mut name_parts = name_tag.split(',');
        let tagged_name = name_parts.next().unwrap_or_default();
        let omit_empty = name_parts.any(|option| option == "omitempty");
        if tagged_name == "-" {
            return Ok(FieldRole::Skip);
        }

        let directives = parse_directives(&field.tag.get(JSONSCHEMA_KEY));
        if directives.first().is_some_and(|directive| directive.is_flag("-")) {
            return Ok(FieldRole::Skip);
        }

        if field.embedded && tagged_name.is_empty() {
            let embedded = peel_pointers(field.descriptor())?;
            if matches!(embedded.kind, Kind::Struct(_) | Kind::Map { .. }) {
                return Ok(FieldRole::Flatten);
            }
        }

        if !field.exported {
            return Ok(FieldRole::Skip);
        }

        let mut required = !self.reflector.required_from_jsonschema_tags && !omit_empty;
        if directives.iter().any(|directive| directive.is_flag("required")) {
            required = true;
        }
        let nullable = directives.iter().any(|directive| directive.is_flag("nullable"));

        let mut name = if tagged_name.is_empty() {
            field.name.to_string()
        } else {
            tagged_name.to_string()
        };
        if let Some(key_namer) = &self.reflector.key_namer {
            name = key_namer(&name);
        }

        Ok(FieldRole::Property(FieldPlan {
            name,
            required,
            nullable,
        }))
    }

    /// Whether a custom schema gets a definition.
    fn promotable(&self, descriptor: &TypeDescriptor) -> bool {
        descriptor.is_named() && !self.reflector.is_inlined(descriptor.id)
    }

    fn definition_name(&mut self, descriptor: &TypeDescriptor) -> String {
        let base = self
            .reflector
            .namer
            .as_ref()
            .and_then(|namer| namer(descriptor))
            .unwrap_or_else(|| descriptor.name.to_string());
        self.registry
            .name_for(descriptor.id, &base, &descriptor.qualified_name())
    }

    /// Stores a finished schema and returns what the use site should
    /// contain.
    fn complete_definition(&mut self, descriptor: &TypeDescriptor, name: &str, schema: Schema) -> Schema {
        let id = descriptor.id;
        if self.inline_root == Some(id) {
            self.registry.finish(id, None);
            return schema;
        }
        if self.reflector.do_not_reference {
            return self.complete_inline(id, schema);
        }
        self.registry.finish(id, Some(schema));
        Schema::reference(self.reference_to(id, name))
    }

    /// Ends the walk of a type whose schema stays at the use site. The
    /// definition is kept only when a cycle referenced it.
    fn complete_inline(&mut self, id: TypeId, schema: Schema) -> Schema {
        let keep = self.registry.is_cycle_target(id).then(|| schema.clone());
        self.registry.finish(id, keep);
        schema
    }

    fn reference_to(&self, id: TypeId, name: &str) -> String {
        if self.inline_root == Some(id) {
            return "#".to_string();
        }
        let root = self.reflector.reference_root();
        if root == DEFINITIONS_POINTER {
            Id::default().def(name).to_string()
        } else {
            format!("{root}{}", json_pointer(name))
        }
    }

    fn lookup_id(&self, descriptor: &TypeDescriptor) -> Result<Option<Id>> {
        let Some(id) = self.reflector.lookup_id(descriptor) else {
            return Ok(None);
        };
        id.validate().map_err(|reason| Error::InvalidLookupId {
            id: id.to_string(),
            type_name: descriptor.display_name().to_string(),
            reason,
        })?;
        Ok(Some(id))
    }
}

/// Follows transparent indirections down to a value type.
fn peel_pointers(descriptor: TypeDescriptor) -> Result<TypeDescriptor> {
    let mut current = descriptor;
    for _ in 0..MAX_POINTER_DEPTH {
        match current.kind {
            Kind::Pointer(inner) => current = inner(),
            _ => return Ok(current),
        }
    }
    Err(Error::MalformedType {
        type_name: current.display_name().to_string(),
        message: format!("pointer chain deeper than {MAX_POINTER_DEPTH}"),
    })
}

fn element_is_unsigned(descriptor: &TypeDescriptor) -> bool {
    match &descriptor.kind {
        Kind::Sequence { element, .. } => {
            peel_pointers(element()).is_ok_and(|element| matches!(element.kind, Kind::Uint))
        }
        _ => false,
    }
}

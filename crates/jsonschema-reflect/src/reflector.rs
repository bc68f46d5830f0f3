//! Reflector configuration.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::descriptor::{Field, Reflect, TypeDescriptor};
use crate::id::{DEFINITIONS_POINTER, Id};
use crate::schema::Schema;

/// Transforms a property name after tag resolution.
pub type KeyNamer = Arc<dyn Fn(&str) -> String + Send + Sync>;
/// Overrides the definition name of a type.
pub type TypeNamer = Arc<dyn Fn(&TypeDescriptor) -> Option<String> + Send + Sync>;
/// Supplies a schema for a type ahead of structural generation.
pub type Mapper = Arc<dyn Fn(&TypeDescriptor) -> Option<Schema> + Send + Sync>;
/// Supplies an external `$id` for a type; references to it use that id.
pub type IdLookup = Arc<dyn Fn(&TypeDescriptor) -> Option<Id> + Send + Sync>;
/// Looks up documentation for a type, or for one of its fields when the
/// field name is non-empty.
pub type CommentLookup = Arc<dyn Fn(&TypeDescriptor, &str) -> Option<String> + Send + Sync>;
/// Adds synthetic fields to a struct after its declared fields.
pub type AdditionalFields = Arc<dyn Fn(&TypeDescriptor) -> Vec<Field> + Send + Sync>;

/// Default tag key for property names.
pub const DEFAULT_FIELD_NAME_TAG: &str = "json";

/// Controls how types are turned into schema documents.
///
/// A reflector is read-only during a call and can be shared between threads;
/// every call builds its own definitions table.
#[derive(Clone, Default)]
pub struct Reflector {
    /// Base for the root `$id`; the root gets `<base>/<kebab-case name>`.
    pub base_schema_id: Option<Id>,
    /// Never emit a root `$id`.
    pub anonymous: bool,
    /// Set `$anchor` on struct schemas to their definition name.
    pub assign_anchor: bool,
    /// Leave struct schemas open instead of `additionalProperties: false`.
    pub allow_additional_properties: bool,
    /// Only the `required` directive marks a field required.
    pub required_from_jsonschema_tags: bool,
    /// Inline every type; `$ref` is used only to break cycles.
    pub do_not_reference: bool,
    /// Inline the root type instead of referencing its definition.
    pub expanded_struct: bool,
    /// Tag key read for property names (`json` when unset).
    pub field_name_tag: Option<String>,
    /// Prefix of generated `$ref`s (`#/$defs/` when unset).
    pub reference_root: Option<String>,
    /// Types that are left out of the output entirely.
    pub ignored_types: Vec<TypeId>,
    /// Types that are always inlined.
    pub inline_types: Vec<TypeId>,
    pub key_namer: Option<KeyNamer>,
    pub namer: Option<TypeNamer>,
    pub mapper: Option<Mapper>,
    pub lookup: Option<IdLookup>,
    pub lookup_comment: Option<CommentLookup>,
    /// Documentation keyed by `module::Type` or `module::Type.field`.
    pub comment_map: HashMap<String, String>,
    pub additional_fields: Option<AdditionalFields>,
    /// Opt-in cache of finished documents keyed by root type.
    pub cache: Option<Arc<SchemaCache>>,
}

impl Reflector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_schema_id(mut self, id: impl Into<Id>) -> Self {
        self.base_schema_id = Some(id.into());
        self
    }

    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    pub fn assign_anchor(mut self, assign: bool) -> Self {
        self.assign_anchor = assign;
        self
    }

    pub fn allow_additional_properties(mut self, allow: bool) -> Self {
        self.allow_additional_properties = allow;
        self
    }

    pub fn required_from_jsonschema_tags(mut self, enabled: bool) -> Self {
        self.required_from_jsonschema_tags = enabled;
        self
    }

    pub fn do_not_reference(mut self, enabled: bool) -> Self {
        self.do_not_reference = enabled;
        self
    }

    pub fn expanded_struct(mut self, enabled: bool) -> Self {
        self.expanded_struct = enabled;
        self
    }

    pub fn with_field_name_tag(mut self, tag: impl Into<String>) -> Self {
        self.field_name_tag = Some(tag.into());
        self
    }

    pub fn with_reference_root(mut self, root: impl Into<String>) -> Self {
        self.reference_root = Some(root.into());
        self
    }

    pub fn ignore_type<T: Reflect>(mut self) -> Self {
        self.ignored_types.push(T::descriptor().id);
        self
    }

    pub fn inline_type<T: Reflect>(mut self) -> Self {
        self.inline_types.push(T::descriptor().id);
        self
    }

    pub fn with_key_namer(mut self, namer: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.key_namer = Some(Arc::new(namer));
        self
    }

    pub fn with_namer(
        mut self,
        namer: impl Fn(&TypeDescriptor) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.namer = Some(Arc::new(namer));
        self
    }

    pub fn with_mapper(
        mut self,
        mapper: impl Fn(&TypeDescriptor) -> Option<Schema> + Send + Sync + 'static,
    ) -> Self {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    pub fn with_lookup(
        mut self,
        lookup: impl Fn(&TypeDescriptor) -> Option<Id> + Send + Sync + 'static,
    ) -> Self {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    pub fn with_lookup_comment(
        mut self,
        lookup: impl Fn(&TypeDescriptor, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.lookup_comment = Some(Arc::new(lookup));
        self
    }

    pub fn with_comment(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.comment_map.insert(key.into(), text.into());
        self
    }

    pub fn with_additional_fields(
        mut self,
        provider: impl Fn(&TypeDescriptor) -> Vec<Field> + Send + Sync + 'static,
    ) -> Self {
        self.additional_fields = Some(Arc::new(provider));
        self
    }

    /// Reuse finished documents across calls. Share a cache only between
    /// reflectors with the same configuration.
    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub(crate) fn field_name_tag(&self) -> &str {
        self.field_name_tag
            .as_deref()
            .unwrap_or(DEFAULT_FIELD_NAME_TAG)
    }

    pub(crate) fn reference_root(&self) -> &str {
        self.reference_root.as_deref().unwrap_or(DEFINITIONS_POINTER)
    }

    pub(crate) fn is_ignored(&self, id: TypeId) -> bool {
        self.ignored_types.contains(&id)
    }

    pub(crate) fn is_inlined(&self, id: TypeId) -> bool {
        self.inline_types.contains(&id)
    }

    /// Documentation for a type (`field` empty) or one of its fields. The
    /// lookup function wins over the comment map.
    pub(crate) fn lookup_comment(&self, descriptor: &TypeDescriptor, field: &str) -> Option<String> {
        if let Some(lookup) = &self.lookup_comment {
            return lookup(descriptor, field).filter(|text| !text.is_empty());
        }
        if self.comment_map.is_empty() || !descriptor.is_named() {
            return None;
        }
        let mut key = descriptor.qualified_name();
        if !field.is_empty() {
            key.push('.');
            key.push_str(field);
        }
        self.comment_map.get(&key).filter(|text| !text.is_empty()).cloned()
    }

    pub(crate) fn lookup_id(&self, descriptor: &TypeDescriptor) -> Option<Id> {
        let lookup = self.lookup.as_ref()?;
        lookup(descriptor).filter(|id| !id.is_empty())
    }
}

impl fmt::Debug for Reflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reflector")
            .field("base_schema_id", &self.base_schema_id)
            .field("anonymous", &self.anonymous)
            .field("assign_anchor", &self.assign_anchor)
            .field("allow_additional_properties", &self.allow_additional_properties)
            .field("required_from_jsonschema_tags", &self.required_from_jsonschema_tags)
            .field("do_not_reference", &self.do_not_reference)
            .field("expanded_struct", &self.expanded_struct)
            .field("field_name_tag", &self.field_name_tag)
            .field("reference_root", &self.reference_root)
            .field("ignored_types", &self.ignored_types.len())
            .field("inline_types", &self.inline_types.len())
            .field("key_namer", &self.key_namer.is_some())
            .field("namer", &self.namer.is_some())
            .field("mapper", &self.mapper.is_some())
            .field("lookup", &self.lookup.is_some())
            .field("lookup_comment", &self.lookup_comment.is_some())
            .field("comment_map", &self.comment_map.len())
            .field("additional_fields", &self.additional_fields.is_some())
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

/// Finished documents keyed by root type.
#[derive(Debug, Default)]
pub struct SchemaCache {
    documents: Mutex<HashMap<TypeId, Schema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TypeId) -> Option<Schema> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn insert(&self, id: TypeId, schema: Schema) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, schema);
    }

    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

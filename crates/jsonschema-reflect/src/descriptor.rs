//! Type descriptors: the static description of a Rust type that the walker
//! reads instead of runtime reflection.
//!
//! Nested types are referenced through [`DescriptorFn`] pointers so that a
//! descriptor can mention itself without being infinite.

use std::any::TypeId;
use std::fmt;

use crate::error::ExtensionError;
use crate::schema::Schema;
use crate::tag::StructTag;

/// Lazily produces the descriptor of a nested type.
pub type DescriptorFn = fn() -> TypeDescriptor;

/// A type that can describe itself to the walker.
pub trait Reflect: 'static {
    fn descriptor() -> TypeDescriptor;
}

/// Structural category of a type.
#[derive(Debug, Clone)]
pub enum Kind {
    Bool,
    /// Signed integers.
    Int,
    /// Unsigned integers.
    Uint,
    Float,
    String,
    /// Byte sequences, written as base64 strings.
    Bytes,
    Null,
    /// Any JSON value; produces an unconstrained schema.
    Any,
    /// A string with a well-known `format`.
    Format(&'static str),
    /// Unit-variant enum serialized as one of the listed names.
    Enum(Vec<&'static str>),
    Struct(Vec<Field>),
    Sequence {
        element: DescriptorFn,
        len: Option<usize>,
        unique: bool,
    },
    Tuple(Vec<DescriptorFn>),
    Map {
        key: DescriptorFn,
        value: DescriptorFn,
    },
    /// Transparent indirection (`Option`, `Box`, `Arc`, ...).
    Pointer(DescriptorFn),
}

impl Kind {
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Kind::Struct(_) | Kind::Sequence { .. } | Kind::Map { .. } | Kind::Enum(_) | Kind::Tuple(_)
        )
    }
}

/// A struct field.
#[derive(Clone)]
pub struct Field {
    /// Source name, used when the field-name tag gives none.
    pub name: &'static str,
    pub ty: DescriptorFn,
    pub tag: StructTag,
    /// Embedded struct fields are flattened into the parent.
    pub embedded: bool,
    /// Non-exported fields are skipped unless embedded.
    pub exported: bool,
}

impl Field {
    pub fn new<T: Reflect>(name: &'static str) -> Self {
        Self::with_descriptor(name, T::descriptor)
    }

    pub fn with_descriptor(name: &'static str, ty: DescriptorFn) -> Self {
        Self {
            name,
            ty,
            tag: StructTag::default(),
            embedded: false,
            exported: true,
        }
    }

    pub fn tag(mut self, tag: impl Into<StructTag>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }

    pub fn descriptor(&self) -> TypeDescriptor {
        (self.ty)()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("embedded", &self.embedded)
            .field("exported", &self.exported)
            .finish_non_exhaustive()
    }
}

/// Optional hooks a type can expose to override or adjust its schema.
#[derive(Clone, Copy, Default)]
pub struct Capabilities {
    /// Replaces structural generation entirely.
    pub schema: Option<fn() -> Result<Schema, ExtensionError>>,
    /// Generates the schema of another type in place of this one.
    pub alias: Option<DescriptorFn>,
    /// Per-property type substitution, keyed by rendered property name.
    pub property_alias: Option<fn(&str) -> Option<TypeDescriptor>>,
    /// Mutates the generated schema before it is stored or returned.
    pub extend: Option<fn(&mut Schema) -> Result<(), ExtensionError>>,
    /// Description override keyed by source field name.
    pub field_doc: Option<fn(&str) -> Option<String>>,
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("schema", &self.schema.is_some())
            .field("alias", &self.alias.is_some())
            .field("property_alias", &self.property_alias.is_some())
            .field("extend", &self.extend.is_some())
            .field("field_doc", &self.field_doc.is_some())
            .finish()
    }
}

/// Static description of one type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub id: TypeId,
    /// Type name; empty for anonymous types, which are always inlined.
    pub name: &'static str,
    pub module_path: &'static str,
    pub kind: Kind,
    pub capabilities: Capabilities,
}

impl TypeDescriptor {
    pub fn new<T: ?Sized + 'static>(name: &'static str, kind: Kind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
            module_path: "",
            kind,
            capabilities: Capabilities::default(),
        }
    }

    /// An unnamed descriptor; never promoted to a definition.
    pub fn anonymous<T: ?Sized + 'static>(kind: Kind) -> Self {
        Self::new::<T>("", kind)
    }

    pub fn structure<T: ?Sized + 'static>(
        name: &'static str,
        module_path: &'static str,
        fields: Vec<Field>,
    ) -> Self {
        Self::new::<T>(name, Kind::Struct(fields)).with_module_path(module_path)
    }

    pub fn with_module_path(mut self, module_path: &'static str) -> Self {
        self.module_path = module_path;
        self
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_schema(mut self, schema: fn() -> Result<Schema, ExtensionError>) -> Self {
        self.capabilities.schema = Some(schema);
        self
    }

    pub fn with_alias(mut self, alias: DescriptorFn) -> Self {
        self.capabilities.alias = Some(alias);
        self
    }

    pub fn with_property_alias(mut self, alias: fn(&str) -> Option<TypeDescriptor>) -> Self {
        self.capabilities.property_alias = Some(alias);
        self
    }

    pub fn with_extend(mut self, extend: fn(&mut Schema) -> Result<(), ExtensionError>) -> Self {
        self.capabilities.extend = Some(extend);
        self
    }

    pub fn with_field_doc(mut self, field_doc: fn(&str) -> Option<String>) -> Self {
        self.capabilities.field_doc = Some(field_doc);
        self
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }

    /// `module::path::Name`, or the bare name when no module path is known.
    pub fn qualified_name(&self) -> String {
        if self.module_path.is_empty() {
            self.name.to_string()
        } else {
            format!("{}::{}", self.module_path, self.name)
        }
    }

    /// Name for diagnostics; never empty.
    pub fn display_name(&self) -> &'static str {
        if self.name.is_empty() {
            "<anonymous>"
        } else {
            self.name
        }
    }
}

/// Descriptor for a byte sequence (`{"type":"string","contentEncoding":"base64"}`).
pub fn bytes_descriptor() -> TypeDescriptor {
    TypeDescriptor::anonymous::<[u8]>(Kind::Bytes)
}

/// Descriptor for a `T` value.
pub fn descriptor_of<T: Reflect>() -> TypeDescriptor {
    T::descriptor()
}

//! jsonschema-reflect - JSON Schema (draft 2020-12) documents from Rust types.
//!
//! Types describe themselves through [`Reflect`], usually derived. Field tags
//! use the `key:"value"` convention: the `json` key names the property, the
//! `jsonschema` key carries constraint directives.
//!
//! # Usage
//!
//! ```ignore
//! use jsonschema_reflect::Reflect;
//!
//! #[derive(Reflect)]
//! pub struct User {
//!     #[reflect(tag = r#"json:"id" jsonschema:"minimum=1""#)]
//!     pub id: u64,
//!     #[reflect(tag = r#"json:"name,omitempty" jsonschema:"title=the name,maxLength=20""#)]
//!     pub name: String,
//! }
//!
//! let schema = jsonschema_reflect::reflect::<User>()?;
//! println!("{}", serde_json::to_string_pretty(&schema)?);
//! ```

mod descriptor;
mod error;
mod id;
mod impls;
mod keywords;
mod reflector;
mod registry;
mod schema;
mod tag;
mod walker;

pub use descriptor::{
    Capabilities, DescriptorFn, Field, Kind, Reflect, TypeDescriptor, bytes_descriptor,
    descriptor_of,
};
pub use error::{Error, ExtensionError, Result};
pub use id::{DEFINITIONS_POINTER, Id, IdError, json_pointer};
pub use reflector::{
    AdditionalFields, CommentLookup, DEFAULT_FIELD_NAME_TAG, IdLookup, KeyNamer, Mapper,
    Reflector, SchemaCache, TypeNamer,
};
pub use schema::{Definitions, Properties, Schema, SchemaType, UnknownSchemaType, VERSION};
pub use tag::{
    DESCRIPTION_KEY, Directive, EXTRAS_KEY, JSONSCHEMA_KEY, StructTag, parse_directives,
    split_on_unescaped_commas,
};

#[cfg(feature = "derive")]
pub use jsonschema_reflect_derive::Reflect;

/// Re-exported for capability implementations.
pub use anyhow;

/// Reflects `T` with the default configuration.
pub fn reflect<T: Reflect>() -> Result<Schema> {
    Reflector::default().reflect::<T>()
}

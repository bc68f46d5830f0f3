use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, Field, Fields, GenericParam, Lit, Meta, Path,
    Type, Visibility, parse_macro_input, parse_quote,
};

#[derive(Default)]
struct ContainerAttrs {
    name: Option<String>,
    rename: Option<String>,
    rename_all: Option<RenameRule>,
    schema_with: Option<Path>,
    alias: Option<Type>,
    extend_with: Option<Path>,
    field_doc_with: Option<Path>,
    property_alias_with: Option<Path>,
}

#[derive(Default)]
struct FieldAttrs {
    tag: Option<String>,
    embed: bool,
    bytes: bool,
    rename: Option<String>,
    skip: bool,
    omit_empty: bool,
}

#[derive(Default)]
struct VariantAttrs {
    rename: Option<String>,
}

#[derive(Clone, Copy)]
enum RenameRule {
    Camel,
    Snake,
    Pascal,
    Kebab,
    ScreamingSnake,
    Lower,
    Upper,
    ScreamingKebab,
}

impl RenameRule {
    fn apply(self, name: &str) -> String {
        let case = match self {
            RenameRule::Camel => Case::Camel,
            RenameRule::Snake => Case::Snake,
            RenameRule::Pascal => Case::Pascal,
            RenameRule::Kebab => Case::Kebab,
            RenameRule::ScreamingSnake => Case::UpperSnake,
            RenameRule::ScreamingKebab => Case::UpperKebab,
            // serde lowercases without inserting separators
            RenameRule::Lower => return name.to_lowercase(),
            RenameRule::Upper => return name.to_uppercase(),
        };
        name.to_case(case)
    }
}

/// Derives `jsonschema_reflect::Reflect`.
///
/// Field tags come from `#[reflect(tag = "...")]`; relevant `#[serde(...)]`
/// attributes fill in the `json` entry when the tag has none.
#[proc_macro_derive(Reflect, attributes(reflect, serde))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.into_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let runtime = resolve_runtime_crate()?;
    validate_input(input)?;

    let container = parse_container_attrs(&input.attrs)?;
    let ident = &input.ident;
    let type_name = container
        .name
        .clone()
        .or_else(|| container.rename.clone())
        .unwrap_or_else(|| ident.to_string());

    let body = match &input.data {
        Data::Struct(data) => struct_descriptor(&runtime, &type_name, &data.fields, &container)?,
        Data::Enum(data) => enum_descriptor(&runtime, &type_name, data, &container)?,
        Data::Union(_) => unreachable!("unions are rejected by validate_input"),
    };
    let capabilities = capability_calls(&runtime, &container);

    let mut generics = input.generics.clone();
    let type_params: Vec<_> = generics
        .type_params()
        .map(|param| param.ident.clone())
        .collect();
    let where_clause = generics.make_where_clause();
    for param in type_params {
        where_clause
            .predicates
            .push(parse_quote!(#param: #runtime::Reflect));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #runtime::Reflect for #ident #ty_generics #where_clause {
            fn descriptor() -> #runtime::TypeDescriptor {
                #body
                    .with_module_path(::core::module_path!())
                    #capabilities
            }
        }
    })
}

fn resolve_runtime_crate() -> syn::Result<Path> {
    if let Some(path) = find_crate_path("jsonschema-reflect") {
        return Ok(path);
    }

    Err(syn::Error::new(
        Span::call_site(),
        "could not resolve the jsonschema-reflect runtime crate; expected a dependency on `jsonschema-reflect`",
    ))
}

fn find_crate_path(package_name: &str) -> Option<Path> {
    match crate_name(package_name).ok()? {
        FoundCrate::Itself => Some(parse_quote!(crate)),
        FoundCrate::Name(name) => {
            let ident = syn::Ident::new(&name.replace('-', "_"), Span::call_site());
            Some(parse_quote!(::#ident))
        }
    }
}

fn validate_input(input: &DeriveInput) -> syn::Result<()> {
    for param in &input.generics.params {
        if let GenericParam::Lifetime(lifetime) = param {
            return Err(syn::Error::new_spanned(
                lifetime,
                "Reflect does not support lifetime parameters; hint: use owned field types",
            ));
        }
    }

    match &input.data {
        Data::Struct(_) => Ok(()),
        Data::Enum(data) => {
            for variant in &data.variants {
                if !matches!(variant.fields, Fields::Unit) {
                    return Err(syn::Error::new_spanned(
                        variant,
                        "Reflect only supports enums with unit variants; hint: implement Reflect by hand or use a custom schema",
                    ));
                }
            }
            Ok(())
        }
        Data::Union(union) => Err(syn::Error::new(
            union.union_token.span(),
            "Reflect does not support `union` items; hint: use a struct or enum instead",
        )),
    }
}

fn struct_descriptor(
    runtime: &Path,
    type_name: &str,
    fields: &Fields,
    container: &ContainerAttrs,
) -> syn::Result<TokenStream2> {
    match fields {
        Fields::Named(named) => {
            let mut field_tokens = Vec::with_capacity(named.named.len());
            for field in &named.named {
                field_tokens.push(named_field(runtime, field, container)?);
            }
            Ok(quote! {
                #runtime::TypeDescriptor::structure::<Self>(
                    #type_name,
                    "",
                    ::std::vec![#(#field_tokens),*],
                )
            })
        }
        Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
            // A newtype keeps the inner kind and hooks; container attributes override them.
            let inner = &unnamed.unnamed[0].ty;
            Ok(quote! {
                ({
                    let inner = <#inner as #runtime::Reflect>::descriptor();
                    let mut descriptor = #runtime::TypeDescriptor::new::<Self>(#type_name, inner.kind);
                    descriptor.capabilities = inner.capabilities;
                    descriptor
                })
            })
        }
        Fields::Unnamed(unnamed) => {
            let elements = unnamed.unnamed.iter().map(|field| {
                let ty = &field.ty;
                quote!(<#ty as #runtime::Reflect>::descriptor)
            });
            Ok(quote! {
                #runtime::TypeDescriptor::new::<Self>(
                    #type_name,
                    #runtime::Kind::Tuple(::std::vec![#(#elements),*]),
                )
            })
        }
        Fields::Unit => Ok(quote! {
            #runtime::TypeDescriptor::new::<Self>(#type_name, #runtime::Kind::Null)
        }),
    }
}

fn named_field(runtime: &Path, field: &Field, container: &ContainerAttrs) -> syn::Result<TokenStream2> {
    let attrs = parse_field_attrs(&field.attrs)?;
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
    let source_name = ident.to_string().trim_start_matches("r#").to_string();

    let ty = &field.ty;
    let descriptor = if attrs.bytes {
        quote!(#runtime::bytes_descriptor)
    } else {
        quote!(<#ty as #runtime::Reflect>::descriptor)
    };

    let tag = compose_tag(&source_name, &attrs, container);
    let tag_call = (!tag.is_empty()).then(|| quote!(.tag(#tag)));
    let embed_call = attrs.embed.then(|| quote!(.embedded()));
    let private_call = (!matches!(field.vis, Visibility::Public(_))).then(|| quote!(.private()));

    Ok(quote! {
        #runtime::Field::with_descriptor(#source_name, #descriptor)
            #tag_call
            #embed_call
            #private_call
    })
}

/// Joins the explicit tag with a `json` entry synthesized from serde
/// attributes, unless the explicit tag already names one.
fn compose_tag(source_name: &str, attrs: &FieldAttrs, container: &ContainerAttrs) -> String {
    let explicit = attrs.tag.clone().unwrap_or_default();
    if has_tag_key(&explicit, "json") {
        return explicit;
    }

    let name = if attrs.skip {
        Some("-".to_string())
    } else if attrs.embed {
        None
    } else if let Some(rename) = &attrs.rename {
        Some(rename.clone())
    } else {
        container.rename_all.map(|rule| rule.apply(source_name))
    };

    let synthesized = match (name, attrs.omit_empty && !attrs.skip) {
        (None, false) => String::new(),
        (name, omit_empty) => {
            let mut value = name.unwrap_or_default();
            if omit_empty {
                value.push_str(",omitempty");
            }
            format!("json:\"{value}\"")
        }
    };

    match (synthesized.is_empty(), explicit.is_empty()) {
        (true, _) => explicit,
        (false, true) => synthesized,
        (false, false) => format!("{synthesized} {explicit}"),
    }
}

fn has_tag_key(tag: &str, key: &str) -> bool {
    let prefix = format!("{key}:\"");
    tag.starts_with(&prefix) || tag.contains(&format!(" {prefix}"))
}

fn enum_descriptor(
    runtime: &Path,
    type_name: &str,
    data: &syn::DataEnum,
    container: &ContainerAttrs,
) -> syn::Result<TokenStream2> {
    let mut names = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        let attrs = parse_variant_attrs(&variant.attrs)?;
        let name = match (attrs.rename, container.rename_all) {
            (Some(rename), _) => rename,
            (None, Some(rule)) => rule.apply(&variant.ident.to_string()),
            (None, None) => variant.ident.to_string(),
        };
        names.push(name);
    }
    Ok(quote! {
        #runtime::TypeDescriptor::new::<Self>(
            #type_name,
            #runtime::Kind::Enum(::std::vec![#(#names),*]),
        )
    })
}

fn capability_calls(runtime: &Path, container: &ContainerAttrs) -> TokenStream2 {
    let schema = container
        .schema_with
        .as_ref()
        .map(|path| quote!(.with_schema(#path)));
    let alias = container
        .alias
        .as_ref()
        .map(|ty| quote!(.with_alias(<#ty as #runtime::Reflect>::descriptor)));
    let extend = container
        .extend_with
        .as_ref()
        .map(|path| quote!(.with_extend(#path)));
    let field_doc = container
        .field_doc_with
        .as_ref()
        .map(|path| quote!(.with_field_doc(#path)));
    let property_alias = container
        .property_alias_with
        .as_ref()
        .map(|path| quote!(.with_property_alias(#path)));
    quote!(#schema #alias #extend #field_doc #property_alias)
}

fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();
    for attr in attrs {
        if attr.path().is_ident("reflect") {
            parse_reflect_container_meta(attr, &mut out)?;
        }
        if attr.path().is_ident("serde") {
            parse_serde_container_meta(attr, &mut out)?;
        }
    }
    Ok(out)
}

fn parse_reflect_container_meta(attr: &Attribute, out: &mut ContainerAttrs) -> syn::Result<()> {
    for meta in parse_meta_list(attr)? {
        match meta {
            Meta::NameValue(meta) if meta.path.is_ident("name") => {
                out.name = Some(parse_string_expr(&meta.value, meta.span())?);
            }
            Meta::NameValue(meta) if meta.path.is_ident("schema_with") => {
                out.schema_with = Some(parse_path_expr(&meta.value, meta.span())?);
            }
            Meta::NameValue(meta) if meta.path.is_ident("alias") => {
                let value = parse_string_expr(&meta.value, meta.span())?;
                out.alias = Some(syn::parse_str(&value).map_err(|err| {
                    syn::Error::new(meta.span(), format!("invalid alias type: {err}"))
                })?);
            }
            Meta::NameValue(meta) if meta.path.is_ident("extend_with") => {
                out.extend_with = Some(parse_path_expr(&meta.value, meta.span())?);
            }
            Meta::NameValue(meta) if meta.path.is_ident("field_doc_with") => {
                out.field_doc_with = Some(parse_path_expr(&meta.value, meta.span())?);
            }
            Meta::NameValue(meta) if meta.path.is_ident("property_alias_with") => {
                out.property_alias_with = Some(parse_path_expr(&meta.value, meta.span())?);
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unsupported reflect container attribute; expected one of name, schema_with, alias, extend_with, field_doc_with, property_alias_with",
                ));
            }
        }
    }
    Ok(())
}

fn parse_serde_container_meta(attr: &Attribute, out: &mut ContainerAttrs) -> syn::Result<()> {
    for meta in parse_meta_list(attr)? {
        match meta {
            Meta::NameValue(meta) if meta.path.is_ident("rename") => {
                if out.rename.is_none()
                    && let Ok(value) = parse_string_expr(&meta.value, meta.span())
                {
                    out.rename = Some(value);
                }
            }
            Meta::NameValue(meta) if meta.path.is_ident("rename_all") => {
                if out.rename_all.is_none() {
                    out.rename_all = Some(parse_rename_rule(&meta.value, meta.span())?);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs {
        if attr.path().is_ident("reflect") {
            parse_reflect_field_meta(attr, &mut out)?;
        }
        if attr.path().is_ident("serde") {
            parse_serde_field_meta(attr, &mut out)?;
        }
    }
    Ok(out)
}

fn parse_reflect_field_meta(attr: &Attribute, out: &mut FieldAttrs) -> syn::Result<()> {
    for meta in parse_meta_list(attr)? {
        match meta {
            Meta::NameValue(meta) if meta.path.is_ident("tag") => {
                out.tag = Some(parse_string_expr(&meta.value, meta.span())?);
            }
            Meta::Path(path) if path.is_ident("embed") => {
                out.embed = true;
            }
            Meta::Path(path) if path.is_ident("bytes") => {
                out.bytes = true;
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unsupported reflect field attribute; expected one of tag, embed, bytes",
                ));
            }
        }
    }
    Ok(())
}

fn parse_serde_field_meta(attr: &Attribute, out: &mut FieldAttrs) -> syn::Result<()> {
    for meta in parse_meta_list(attr)? {
        match meta {
            Meta::NameValue(meta) if meta.path.is_ident("rename") => {
                if out.rename.is_none()
                    && let Ok(value) = parse_string_expr(&meta.value, meta.span())
                {
                    out.rename = Some(value);
                }
            }
            Meta::Path(path) if path.is_ident("skip") || path.is_ident("skip_serializing") => {
                out.skip = true;
            }
            Meta::Path(path) if path.is_ident("default") => {
                out.omit_empty = true;
            }
            Meta::NameValue(meta)
                if meta.path.is_ident("default") || meta.path.is_ident("skip_serializing_if") =>
            {
                out.omit_empty = true;
            }
            Meta::Path(path) if path.is_ident("flatten") => {
                out.embed = true;
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_variant_attrs(attrs: &[Attribute]) -> syn::Result<VariantAttrs> {
    let mut out = VariantAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        for meta in parse_meta_list(attr)? {
            if let Meta::NameValue(meta) = meta
                && meta.path.is_ident("rename")
                && out.rename.is_none()
            {
                out.rename = Some(parse_string_expr(&meta.value, meta.span())?);
            }
        }
    }
    Ok(out)
}

fn parse_meta_list(attr: &Attribute) -> syn::Result<Vec<Meta>> {
    let metas = attr
        .parse_args_with(syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated)?;
    Ok(metas.into_iter().collect())
}

fn parse_string_expr(expr: &Expr, span: Span) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(value),
            ..
        }) => Ok(value.value()),
        _ => Err(syn::Error::new(
            span,
            "expected string literal; hint: wrap the value in quotes",
        )),
    }
}

fn parse_path_expr(expr: &Expr, span: Span) -> syn::Result<Path> {
    let value = parse_string_expr(expr, span)?;
    syn::parse_str(&value)
        .map_err(|err| syn::Error::new(span, format!("expected a function path: {err}")))
}

fn parse_rename_rule(expr: &Expr, span: Span) -> syn::Result<RenameRule> {
    let value = parse_string_expr(expr, span)?;
    match value.as_str() {
        "camelCase" => Ok(RenameRule::Camel),
        "snake_case" => Ok(RenameRule::Snake),
        "PascalCase" => Ok(RenameRule::Pascal),
        "kebab-case" => Ok(RenameRule::Kebab),
        "SCREAMING_SNAKE_CASE" => Ok(RenameRule::ScreamingSnake),
        "lowercase" => Ok(RenameRule::Lower),
        "UPPERCASE" => Ok(RenameRule::Upper),
        "SCREAMING-KEBAB-CASE" => Ok(RenameRule::ScreamingKebab),
        _ => Err(syn::Error::new(span, "unsupported rename_all value")),
    }
}

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use std::fmt::{self, Debug};
use strata_core::{ColumnType, decode_type};
use syn::{Field, Ident, LitStr, Type, parse::ParseBuffer};

pub(crate) struct ColumnMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    /// Column name, the field name unless renamed.
    pub(crate) name: String,
    pub(crate) column_type: Option<ColumnType>,
    pub(crate) optional: bool,
    pub(crate) data_type: Option<String>,
    pub(crate) not_null: bool,
    pub(crate) default: Option<String>,
    pub(crate) insert: bool,
    pub(crate) update: bool,
    pub(crate) primary_key: bool,
    pub(crate) identity: bool,
    pub(crate) ignore: bool,
}

impl Debug for ColumnMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnMetadata")
            .field("ident", &self.ident)
            .field("ty", &"..")
            .field("name", &self.name)
            .field("column_type", &self.column_type)
            .field("optional", &self.optional)
            .field("data_type", &self.data_type)
            .field("not_null", &self.not_null)
            .field("default", &self.default)
            .field("insert", &self.insert)
            .field("update", &self.update)
            .field("primary_key", &self.primary_key)
            .field("identity", &self.identity)
            .field("ignore", &self.ignore)
            .finish()
    }
}

impl ColumnMetadata {
    /// Name of the field as written in the struct.
    pub(crate) fn field_name(&self) -> String {
        self.ident.to_string()
    }

    /// `ColumnDescriptor` construction, `index` is the position of the field accessors.
    pub(crate) fn encode_descriptor(&self, index: usize) -> TokenStream {
        let name = &self.name;
        let field = self.field_name();
        let Some(column_type) = self.column_type else {
            panic!(
                "Cannot map the type `{}` of field `{}` to a column, mark it with `#[strata(ignore)]`",
                self.ty.to_token_stream(),
                field
            );
        };
        let mut result = quote! {
            ::strata::ColumnDescriptor::new(#name, #field, #index, #column_type)
        };
        if let Some(data_type) = &self.data_type {
            result.extend(quote!(.data_type(#data_type)));
        }
        if self.not_null {
            result.extend(quote!(.nullable(false)));
        }
        if let Some(default) = &self.default {
            result.extend(quote!(.default_value(#default)));
        }
        if !self.insert {
            result.extend(quote!(.no_insert()));
        }
        if !self.update {
            result.extend(quote!(.no_update()));
        }
        result
    }
}

fn flag(arg: &syn::meta::ParseNestedMeta, name: &str) {
    // value() is Err for Meta::Path
    let Err(..) = arg.value() else {
        panic!(
            "Error while parsing `{}`, use it like: `#[strata({})]`",
            name, name
        );
    };
}

pub(crate) fn decode_column(field: &Field) -> ColumnMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Field is expected to have a name");
    let (column_type, optional) = match decode_type(&field.ty) {
        Some((column_type, optional)) => (Some(column_type), optional),
        None => (None, false),
    };
    let mut name = ident.to_string();
    if name.starts_with("r#") {
        name.drain(..2);
    }
    let mut metadata = ColumnMetadata {
        ident,
        ty: field.ty.clone(),
        name,
        column_type,
        optional,
        data_type: None,
        not_null: false,
        default: None,
        insert: true,
        update: true,
        primary_key: false,
        identity: false,
        ignore: false,
    };
    for attr in &field.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("strata") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `strata`, use it like: `#[strata(attribute = value, ..)]`");
        };
        let result = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("column") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `column`, use it like: `#[strata(column = \"MY_COLUMN\")]`");
                };
                metadata.name = v.value();
            } else if arg.path.is_ident("data_type") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `data_type`, use it like: `#[strata(data_type = \"varchar(50)\")]`");
                };
                metadata.data_type = Some(v.value());
            } else if arg.path.is_ident("default") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `default`, use it like: `#[strata(default = \"0\")]`");
                };
                metadata.default = Some(v.value());
            } else if arg.path.is_ident("not_null") {
                flag(&arg, "not_null");
                metadata.not_null = true;
            } else if arg.path.is_ident("no_insert") {
                flag(&arg, "no_insert");
                metadata.insert = false;
            } else if arg.path.is_ident("no_update") {
                flag(&arg, "no_update");
                metadata.update = false;
            } else if arg.path.is_ident("primary_key") {
                flag(&arg, "primary_key");
                metadata.primary_key = true;
            } else if arg.path.is_ident("identity") {
                flag(&arg, "identity");
                metadata.identity = true;
            } else if arg.path.is_ident("ignore") {
                flag(&arg, "ignore");
                metadata.ignore = true;
            } else {
                panic!(
                    "Unknown attribute `{}` inside strata macro",
                    arg.path.to_token_stream()
                );
            }
            Ok(())
        });
        if let Err(e) = result {
            panic!("Error while parsing `strata` on field `{}`: {}", metadata.ident, e);
        }
    }
    if metadata.identity && !metadata.primary_key {
        panic!(
            "Field `{}` is marked `identity` but is not a `primary_key`",
            metadata.ident
        );
    }
    if metadata.not_null && metadata.optional {
        panic!(
            "Field `{}` is an `Option` and cannot be `not_null`",
            metadata.ident
        );
    }
    metadata
}

use crate::decode_column::{ColumnMetadata, decode_column};
use convert_case::{Case, Casing};
use quote::ToTokens;
use strata_core::{CachePolicy, Partitioning};
use syn::{Fields, ItemStruct, LitInt, LitStr, parse::ParseBuffer};

pub(crate) struct TableMetadata {
    pub(crate) item: ItemStruct,
    /// Mapped fields, in declaration order.
    pub(crate) columns: Vec<ColumnMetadata>,
    pub(crate) name: String,
    pub(crate) partitioning: Partitioning,
    pub(crate) create_sql: Option<String>,
    pub(crate) cache: CachePolicy,
    pub(crate) cache_seconds: u32,
}

pub(crate) fn decode_table(item: ItemStruct) -> TableMetadata {
    if !item.generics.params.is_empty() {
        panic!("Generic type `{}` cannot be mapped", item.ident);
    }
    let Fields::Named(..) = &item.fields else {
        panic!("Type `{}` must have named fields to be mapped", item.ident);
    };
    let columns = item
        .fields
        .iter()
        .map(decode_column)
        .filter(|v| !v.ignore)
        .collect();
    let mut name = item.ident.to_string().to_case(Case::UpperSnake);
    let mut partitioning = Partitioning::None;
    let mut create_sql = None;
    let mut cache = CachePolicy::None;
    let mut cache_seconds = 0;
    for attr in &item.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("strata") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `strata`, use it like: `#[strata(attribute = value, ..)]`");
        };
        let result = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("table") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `table`, use it like: `#[strata(table = \"ORDERS\")]`");
                };
                name = v.value();
            } else if arg.path.is_ident("partition") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `partition`, use it like: `#[strata(partition = \"monthly\")]`");
                };
                partitioning = match v.value().parse() {
                    Ok(v) => v,
                    Err(..) => panic!(
                        "Unknown partitioning `{}`, expected one of: none, yearly, quarterly, monthly, daily",
                        v.value()
                    ),
                };
            } else if arg.path.is_ident("create_sql") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `create_sql`, use it like: `#[strata(create_sql = \"create table ORDERS (..)\")]`");
                };
                create_sql = Some(v.value());
            } else if arg.path.is_ident("cache") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `cache`, use it like: `#[strata(cache = \"object\")]`");
                };
                cache = match v.value().parse() {
                    Ok(v) => v,
                    Err(..) => panic!(
                        "Unknown cache policy `{}`, expected one of: none, object, list",
                        v.value()
                    ),
                };
            } else if arg.path.is_ident("cache_seconds") {
                let Ok(v) = arg
                    .value()
                    .and_then(ParseBuffer::parse::<LitInt>)
                    .and_then(|v| v.base10_parse::<u32>())
                else {
                    panic!("Error while parsing `cache_seconds`, use it like: `#[strata(cache_seconds = 60)]`");
                };
                cache_seconds = v;
            } else {
                panic!(
                    "Unknown attribute `{}` inside strata macro",
                    arg.path.to_token_stream()
                );
            }
            Ok(())
        });
        if let Err(e) = result {
            panic!("Error while parsing `strata` on `{}`: {}", item.ident, e);
        }
    }
    TableMetadata {
        item,
        columns,
        name,
        partitioning,
        create_sql,
        cache,
        cache_seconds,
    }
}

mod as_value_enum;
mod decode_column;
mod decode_table;
mod entity_trait;
mod record_trait;

use as_value_enum::as_value_enum;
use decode_table::decode_table;
use entity_trait::entity_trait;
use proc_macro::TokenStream;
use quote::quote;
use record_trait::record_trait;
use syn::{ItemEnum, ItemStruct, parse_macro_input};

/// Maps a struct to a table.
///
/// Table attributes: `#[strata(table = "ORDERS", partition = "monthly", create_sql = "..",
/// cache = "object", cache_seconds = 60)]`. Field attributes: `column = "NAME"`,
/// `data_type = "varchar(50)"`, `default = "0"`, `not_null`, `no_insert`, `no_update`,
/// `primary_key`, `identity`, `ignore`.
#[proc_macro_derive(Entity, attributes(strata))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    let table = decode_table(item);
    let record = record_trait(&table, |c| c.field_name());
    let entity = entity_trait(&table);
    quote! {
        #record
        #entity
    }
    .into()
}

/// Populates a struct from any result, fields are matched by name (or by
/// `#[strata(column = "..")]`) ignoring case.
#[proc_macro_derive(Record, attributes(strata))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    let table = decode_table(item);
    record_trait(&table, |c| c.name.clone()).into()
}

#[proc_macro_derive(AsValue)]
pub fn derive_as_value(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemEnum);
    as_value_enum(&item).into()
}

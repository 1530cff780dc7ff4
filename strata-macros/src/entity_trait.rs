use crate::decode_table::TableMetadata;
use proc_macro2::TokenStream;
use quote::quote;
use strata_core::KeyGeneration;

pub(crate) fn entity_trait(table: &TableMetadata) -> TokenStream {
    let name = &table.item.ident;
    let table_name = &table.name;
    let partitioning = table.partitioning;
    let cache = table.cache;
    let cache_seconds = table.cache_seconds;
    let create_sql = table
        .create_sql
        .as_ref()
        .map(|v| quote!(.create_sql(#v)));
    if !table.columns.iter().any(|c| c.primary_key) {
        panic!(
            "Type `{}` has no primary key, mark one field with `#[strata(primary_key)]`",
            name
        );
    }
    let primary_keys = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.primary_key)
        .map(|(i, c)| {
            let column = c.encode_descriptor(i);
            let generation = if c.identity {
                KeyGeneration::Identity
            } else {
                KeyGeneration::Unassigned
            };
            quote!(.primary_key(#column, #generation))
        });
    let columns = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.primary_key)
        .map(|(i, c)| {
            let column = c.encode_descriptor(i);
            quote!(.column(#column))
        });
    quote! {
        impl ::strata::Entity for #name {
            fn table() -> ::strata::Result<::strata::TableDescriptor> {
                ::strata::TableDescriptor::builder::<#name>(#table_name)
                    .cache(#cache, #cache_seconds)
                    .partitioning(#partitioning)
                    #create_sql
                    #(#primary_keys)*
                    #(#columns)*
                    .build()
            }
        }
    }
}

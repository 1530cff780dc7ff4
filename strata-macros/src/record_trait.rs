use crate::decode_table::TableMetadata;
use proc_macro2::TokenStream;
use quote::quote;

/// `impl Record` with one field slot per mapped field, `slot_name` gives the name matched
/// against the result columns.
pub(crate) fn record_trait(
    table: &TableMetadata,
    slot_name: impl Fn(&crate::decode_column::ColumnMetadata) -> String,
) -> TokenStream {
    let name = &table.item.ident;
    let count = table.columns.len();
    let slots = table.columns.iter().map(|c| {
        let ident = &c.ident;
        let ty = &c.ty;
        let slot_name = slot_name(c);
        quote! {
            ::strata::FieldSlot {
                name: #slot_name,
                get: |v: &#name| {
                    <#ty as ::strata::AsValue>::as_value(::std::clone::Clone::clone(&v.#ident))
                },
                set: |v: &mut #name, value: ::strata::Value| {
                    v.#ident = <#ty as ::strata::AsValue>::try_from_value(value)?;
                    ::std::result::Result::Ok(())
                },
            }
        }
    });
    quote! {
        impl ::strata::Record for #name {
            fn fields() -> &'static [::strata::FieldSlot<Self>] {
                static FIELDS: [::strata::FieldSlot<#name>; #count] = [#(#slots),*];
                &FIELDS
            }
        }
    }
}

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Fields, ItemEnum};

/// Fieldless enums travel as their `i32` discriminant.
pub(crate) fn as_value_enum(item: &ItemEnum) -> TokenStream {
    let name = &item.ident;
    if !item.generics.params.is_empty() {
        panic!("Generic enum `{}` cannot be stored as a value", name);
    }
    let variants = item
        .variants
        .iter()
        .map(|v| {
            let Fields::Unit = v.fields else {
                panic!(
                    "Variant `{}::{}` has fields, only fieldless enums can be stored as a value",
                    name, v.ident
                );
            };
            &v.ident
        })
        .collect::<Vec<_>>();
    quote! {
        impl ::strata::AsValue for #name {
            fn as_empty_value() -> ::strata::Value {
                ::strata::Value::Int32(None)
            }
            fn as_value(self) -> ::strata::Value {
                ::strata::Value::Int32(Some(self as i32))
            }
            fn try_from_value(value: ::strata::Value) -> ::strata::Result<Self> {
                let discriminant = <i32 as ::strata::AsValue>::try_from_value(value)?;
                #(
                    if discriminant == #name::#variants as i32 {
                        return ::std::result::Result::Ok(#name::#variants);
                    }
                )*
                ::std::result::Result::Err(::strata::Error::msg(format!(
                    "{} is not a discriminant of {}",
                    discriminant,
                    stringify!(#name),
                )))
            }
            fn parse(input: impl AsRef<str>) -> ::strata::Result<Self> {
                let input = input.as_ref().trim();
                #(
                    if input.eq_ignore_ascii_case(stringify!(#variants)) {
                        return ::std::result::Result::Ok(#name::#variants);
                    }
                )*
                let discriminant = <i32 as ::strata::AsValue>::parse(input)?;
                Self::try_from_value(::strata::Value::Int32(Some(discriminant)))
            }
        }
    }
}

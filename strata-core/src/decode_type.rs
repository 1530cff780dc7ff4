use crate::ColumnType;
use syn::{GenericArgument, Path, PathArguments, Type, TypePath, TypeSlice};

/// Checks whether the path ends with the `expect` segments, so that `String` and
/// `std::string::String` both match `["std", "string", "String"]`.
pub fn matches_path(path: &Path, expect: &[&str]) -> bool {
    let len = path.segments.len().min(expect.len());
    path.segments
        .iter()
        .rev()
        .take(len)
        .map(|v| &v.ident)
        .eq(expect.iter().rev().take(len))
}

fn first_generic(path: &Path) -> Option<&Type> {
    let PathArguments::AngleBracketed(arguments) = &path.segments.last()?.arguments else {
        return None;
    };
    arguments.args.iter().find_map(|v| match v {
        GenericArgument::Type(v) => Some(v),
        _ => None,
    })
}

/// Column type and nullability of a field type, as seen by the derive macros.
///
/// Paths not recognized are assumed to be fieldless enums stored as `i32` (see
/// `#[derive(AsValue)]`). Returns `None` for types that cannot be mapped to a column.
pub fn decode_type(ty: &Type) -> Option<(ColumnType, bool)> {
    match ty {
        Type::Path(TypePath { path, .. }) => {
            if let Some(ident) = path.get_ident() {
                let column_type = match ident.to_string().as_str() {
                    "bool" => Some(ColumnType::Boolean),
                    "i8" => Some(ColumnType::Int8),
                    "i16" => Some(ColumnType::Int16),
                    "i32" => Some(ColumnType::Int32),
                    "i64" | "isize" => Some(ColumnType::Int64),
                    "u8" => Some(ColumnType::UInt8),
                    "u16" => Some(ColumnType::UInt16),
                    "u32" => Some(ColumnType::UInt32),
                    "u64" | "usize" => Some(ColumnType::UInt64),
                    "f32" => Some(ColumnType::Float32),
                    "f64" => Some(ColumnType::Float64),
                    "char" | "str" => Some(ColumnType::Text),
                    _ => None,
                };
                if let Some(column_type) = column_type {
                    return Some((column_type, false));
                }
            }
            let column_type = if matches_path(path, &["std", "string", "String"]) {
                ColumnType::Text
            } else if matches_path(path, &["rust_decimal", "Decimal"]) {
                ColumnType::Decimal
            } else if matches_path(path, &["time", "PrimitiveDateTime"]) {
                ColumnType::DateTime
            } else if matches_path(path, &["time", "Duration"]) {
                ColumnType::Interval
            } else if matches_path(path, &["uuid", "Uuid"]) {
                ColumnType::Uuid
            } else if matches_path(path, &["strata", "XmlDocument"]) {
                ColumnType::Xml
            } else if matches_path(path, &["std", "option", "Option"]) {
                return decode_type(first_generic(path)?).map(|(v, _)| (v, true));
            } else if matches_path(path, &["std", "vec", "Vec"])
                || matches_path(path, &["std", "boxed", "Box"])
            {
                let inner = first_generic(path)?;
                return match inner {
                    Type::Path(TypePath { path, .. }) if path.is_ident("u8") => {
                        Some((ColumnType::Bytes, false))
                    }
                    Type::Slice(TypeSlice { elem, .. }) if matches!(
                        elem.as_ref(),
                        Type::Path(TypePath { path, .. }) if path.is_ident("u8")
                    ) =>
                    {
                        Some((ColumnType::Bytes, false))
                    }
                    _ if matches_path(path, &["std", "boxed", "Box"]) => decode_type(inner),
                    _ => None,
                };
            } else if path.segments.last()?.arguments.is_empty() {
                ColumnType::Int32
            } else {
                return None;
            };
            Some((column_type, false))
        }
        Type::Group(group) => decode_type(&group.elem),
        Type::Paren(paren) => decode_type(&paren.elem),
        _ => None,
    }
}

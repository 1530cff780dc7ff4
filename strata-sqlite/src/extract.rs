use libsqlite3_sys::*;
use rust_decimal::Decimal;
use std::{
    ffi::{CStr, c_int},
    slice,
};
use strata_core::{AsValue, ColumnType, Context, Error, Result, Value};

pub(crate) fn extract_name(statement: *mut sqlite3_stmt, index: c_int) -> Result<String> {
    unsafe {
        Ok(CStr::from_ptr(sqlite3_column_name(statement, index))
            .to_str()?
            .into())
    }
}

/// Column type from the declared type, following the SQLite affinity rules.
pub(crate) fn declared_type(statement: *mut sqlite3_stmt, index: c_int) -> Option<ColumnType> {
    let declared = unsafe { sqlite3_column_decltype(statement, index) };
    if declared.is_null() {
        return None;
    }
    let declared = unsafe { CStr::from_ptr(declared) }
        .to_string_lossy()
        .to_uppercase();
    Some(if declared.contains("BOOL") || declared == "BIT" {
        ColumnType::Boolean
    } else if declared.contains("INT") {
        ColumnType::Int64
    } else if declared.contains("UUID") || declared.contains("GUID") {
        ColumnType::Uuid
    } else if declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT")
    {
        ColumnType::Text
    } else if declared.contains("BLOB") {
        ColumnType::Bytes
    } else if declared.contains("REAL") || declared.contains("FLOA") || declared.contains("DOUB")
    {
        ColumnType::Float64
    } else if declared.contains("DEC") || declared.contains("NUMERIC") {
        ColumnType::Decimal
    } else if declared.contains("DATE") || declared.contains("TIME") {
        ColumnType::DateTime
    } else {
        return None;
    })
}

/// Column type from the storage class of the current row, for expression columns.
pub(crate) fn storage_type(statement: *mut sqlite3_stmt, index: c_int) -> ColumnType {
    match unsafe { sqlite3_column_type(statement, index) } {
        SQLITE_INTEGER => ColumnType::Int64,
        SQLITE_FLOAT => ColumnType::Float64,
        SQLITE_BLOB => ColumnType::Bytes,
        _ => ColumnType::Text,
    }
}

fn column_text(statement: *mut sqlite3_stmt, index: c_int) -> String {
    unsafe {
        let ptr = sqlite3_column_text(statement, index);
        let len = sqlite3_column_bytes(statement, index) as usize;
        if ptr.is_null() {
            return String::new();
        }
        String::from_utf8_lossy(slice::from_raw_parts(ptr, len)).into_owned()
    }
}

/// Value of the current row. Decimal columns are read through their text so that the digits
/// survive the REAL storage class.
pub(crate) fn extract_value(
    statement: *mut sqlite3_stmt,
    index: c_int,
    column_type: ColumnType,
) -> Result<Value> {
    unsafe {
        let storage = sqlite3_column_type(statement, index);
        if storage == SQLITE_NULL {
            return Ok(Value::empty(column_type));
        }
        if column_type == ColumnType::Decimal && storage != SQLITE_BLOB {
            let text = column_text(statement, index);
            return text
                .trim()
                .parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(text.trim()))
                .map(|v| Value::Decimal(Some(v)))
                .with_context(|| format!("Cannot read `{}` as a decimal", text));
        }
        Ok(match storage {
            SQLITE_INTEGER => sqlite3_column_int64(statement, index).as_value(),
            SQLITE_FLOAT => sqlite3_column_double(statement, index).as_value(),
            SQLITE_BLOB => {
                let ptr = sqlite3_column_blob(statement, index) as *const u8;
                let len = sqlite3_column_bytes(statement, index) as usize;
                if ptr.is_null() {
                    Value::Blob(Some(Box::default()))
                } else {
                    Value::Blob(Some(slice::from_raw_parts(ptr, len).into()))
                }
            }
            SQLITE_TEXT => column_text(statement, index).as_value(),
            _ => {
                let error = Error::msg(format!("Unexpected column type {}", storage));
                log::error!("{:#}", error);
                return Err(error);
            }
        })
    }
}

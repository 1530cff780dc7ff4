use crate::last_error;
use libsqlite3_sys::*;
use std::{
    ffi::{CString, c_int},
    os::raw::{c_char, c_void},
};
use strata_core::{Context, Error, Parameter, Result, Value, truncate_long};
use time::macros::format_description;

fn bind_text(statement: *mut sqlite3_stmt, index: c_int, text: &str) -> c_int {
    unsafe {
        sqlite3_bind_text(
            statement,
            index,
            text.as_ptr() as *const c_char,
            text.len() as c_int,
            SQLITE_TRANSIENT(),
        )
    }
}

fn bind_value(statement: *mut sqlite3_stmt, index: c_int, value: &Value) -> Result<c_int> {
    if value.is_null() {
        return Ok(unsafe { sqlite3_bind_null(statement, index) });
    }
    Ok(unsafe {
        match value {
            Value::Boolean(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int8(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int16(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int32(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int64(Some(v)) => sqlite3_bind_int64(statement, index, *v),
            Value::UInt8(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::UInt16(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::UInt32(Some(v)) => sqlite3_bind_int64(statement, index, *v as sqlite3_int64),
            Value::UInt64(Some(v)) => {
                let Ok(v) = sqlite3_int64::try_from(*v) else {
                    return Err(Error::msg(format!(
                        "Cannot bind the u64 value `{}` into a sqlite integer because it's out of bounds",
                        v
                    )));
                };
                sqlite3_bind_int64(statement, index, v)
            }
            Value::Float32(Some(v)) => sqlite3_bind_double(statement, index, *v as f64),
            Value::Float64(Some(v)) => sqlite3_bind_double(statement, index, *v),
            Value::Decimal(Some(v)) => bind_text(statement, index, &v.to_string()),
            Value::Varchar(Some(v)) => bind_text(statement, index, v),
            Value::DateTime(Some(v)) => {
                let text = v
                    .format(format_description!(
                        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
                    ))
                    .context("Cannot format the date time parameter")?;
                bind_text(statement, index, &text)
            }
            Value::Uuid(Some(v)) => bind_text(statement, index, &v.hyphenated().to_string()),
            Value::Interval(Some(v)) => sqlite3_bind_int64(
                statement,
                index,
                (v.whole_nanoseconds() / strata_core::TICK_NANOSECONDS) as sqlite3_int64,
            ),
            Value::Blob(Some(v)) => sqlite3_bind_blob(
                statement,
                index,
                v.as_ptr() as *const c_void,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            ),
            Value::Xml(Some(v)) => bind_text(statement, index, v.as_str()),
            _ => sqlite3_bind_null(statement, index),
        }
    })
}

/// Binds the parameters by name. Names not appearing in this statement are skipped, a
/// multi-statement text shares one parameter list.
pub(crate) fn bind_parameters(statement: *mut sqlite3_stmt, parameters: &[Parameter]) -> Result<()> {
    for parameter in parameters {
        let name = CString::new(parameter.name.as_str())
            .with_context(|| format!("Invalid parameter name `{}`", parameter.name))?;
        let index = unsafe { sqlite3_bind_parameter_index(statement, name.as_ptr()) };
        if index == 0 {
            continue;
        }
        let rc = bind_value(statement, index, &parameter.value)?;
        if rc != SQLITE_OK {
            let error = last_error(unsafe { sqlite3_db_handle(statement) }).context(format!(
                "Cannot bind the parameter `{}` with value {}",
                parameter.name,
                truncate_long!(parameter.value.to_string())
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
    }
    Ok(())
}

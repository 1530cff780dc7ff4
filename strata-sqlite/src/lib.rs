mod bind;
mod cbox;
mod connection;
mod driver;
mod extract;

use libsqlite3_sys::{sqlite3, sqlite3_errmsg};
use std::{
    ffi::{CStr, c_char},
    ptr,
};
use strata_core::Error;

pub(crate) use cbox::*;
pub use connection::*;
pub use driver::*;

pub(crate) fn error_message_from_ptr(ptr: &'_ *const c_char) -> &'_ str {
    unsafe {
        if *ptr != ptr::null() {
            CStr::from_ptr(*ptr)
                .to_str()
                .unwrap_or("Unknown error (the error message was not a valid C string)")
        } else {
            "Unknown error (could not extract the error message)"
        }
    }
}

/// Last error reported on the connection.
pub(crate) fn last_error(connection: *mut sqlite3) -> Error {
    let message = unsafe { sqlite3_errmsg(connection) };
    Error::msg(error_message_from_ptr(&message).to_string())
}

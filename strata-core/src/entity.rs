use crate::{Result, TableDescriptor, Value};
use std::fmt::{self, Debug};

/// Accessors of one field, generated by the derive macros.
pub struct FieldSlot<T> {
    pub name: &'static str,
    pub get: fn(&T) -> Value,
    pub set: fn(&mut T, Value) -> Result<()>,
}

impl<T> Debug for FieldSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSlot").field("name", &self.name).finish()
    }
}

/// A type that can be populated from a result row, field by field.
///
/// Usually implemented with `#[derive(Record)]` (plain result types) or
/// `#[derive(Entity)]` (mapped tables).
pub trait Record: Default + Send + 'static {
    fn fields() -> &'static [FieldSlot<Self>];

    fn field(name: &str) -> Option<&'static FieldSlot<Self>> {
        Self::fields()
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
    }
}

/// A record mapped to a table.
pub trait Entity: Record {
    /// Builds the table descriptor. Called once per process by [`crate::Registry`].
    fn table() -> Result<TableDescriptor>;
}

use crate::{DataError, Entity, Result, TableDescriptor};
use std::{
    any::{self, TypeId},
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

/// A type waiting to be registered, see [`Registry::register_scope`].
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub build: fn() -> Result<TableDescriptor>,
}

impl Registration {
    pub fn of<E: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: any::type_name::<E>(),
            build: E::table,
        }
    }
}

/// Builds the list of registrations for [`Registry::register_scope`].
#[macro_export]
macro_rules! scope {
    ($($entity:ty),* $(,)?) => {
        [$($crate::Registration::of::<$entity>()),*]
    };
}

/// Table descriptors of the mapped types, built once and kept for the lifetime of the
/// registry.
#[derive(Default, Debug)]
pub struct Registry {
    tables: RwLock<HashMap<TypeId, Arc<TableDescriptor>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single type, returns the descriptor already known if any.
    pub fn register<E: Entity>(&self) -> Result<Arc<TableDescriptor>> {
        if let Some(table) = self.try_resolve::<E>() {
            return Ok(table);
        }
        let registration = Registration::of::<E>();
        self.register_scope(&[registration])?;
        self.resolve::<E>()
    }

    /// Register all the types of a scope under one exclusive lock. Types already known are
    /// skipped and keep their descriptor.
    pub fn register_scope(&self, scope: &[Registration]) -> Result<()> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        for registration in scope {
            if tables.contains_key(&registration.type_id) {
                continue;
            }
            let table = (registration.build)()?;
            log::debug!(
                "Registered `{}` as table `{}`",
                registration.type_name,
                table.name
            );
            tables.insert(registration.type_id, Arc::new(table));
        }
        Ok(())
    }

    pub fn resolve<E: 'static>(&self) -> Result<Arc<TableDescriptor>> {
        self.try_resolve::<E>()
            .ok_or_else(|| DataError::UnmappedType(any::type_name::<E>().into()).raise())
    }

    pub fn try_resolve<E: 'static>(&self) -> Option<Arc<TableDescriptor>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .cloned()
    }

    /// All the registered descriptors, in no particular order.
    pub fn tables(&self) -> Vec<Arc<TableDescriptor>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

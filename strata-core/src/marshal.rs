use crate::{AsValue, Context, Entity, Record, Result, Row, RowShape, TableDescriptor, Value};
use std::{
    any::{self, Any, TypeId},
    collections::HashMap,
    marker::PhantomData,
    mem,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Routine populating a `T` from rows of one shape: pairs of (column index, field slot).
#[derive(Debug)]
pub struct Marshaller<T> {
    plan: Box<[(usize, usize)]>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Record> Marshaller<T> {
    /// Matches the mapped columns of `table` against the shape, ignoring case.
    pub fn compile_mapped(table: &TableDescriptor, shape: &RowShape) -> Self {
        let plan = table
            .all_columns()
            .filter_map(|column| {
                shape
                    .position(&column.name)
                    .map(|position| (position, column.field_index))
            })
            .collect();
        Self {
            plan,
            _type: PhantomData,
        }
    }

    /// Matches the fields of `T` against the shape by name, ignoring case.
    pub fn compile_plain(shape: &RowShape) -> Self {
        let plan = T::fields()
            .iter()
            .enumerate()
            .filter_map(|(slot, field)| shape.position(field.name).map(|position| (position, slot)))
            .collect();
        Self {
            plan,
            _type: PhantomData,
        }
    }

    /// Number of fields this routine writes.
    pub fn len(&self) -> usize {
        self.plan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }

    /// New instance from the row, NULL columns leave the field to its default.
    pub fn populate(&self, row: Row) -> Result<T> {
        let mut result = T::default();
        let names = row.shape.clone();
        let mut values = row.values.into_vec();
        let fields = T::fields();
        for &(position, slot) in self.plan.iter() {
            let value = mem::take(&mut values[position]);
            if value.is_null() {
                continue;
            }
            let field = &fields[slot];
            (field.set)(&mut result, value).with_context(|| {
                format!(
                    "While reading column `{}` into `{}::{}`",
                    names.names[position],
                    any::type_name::<T>(),
                    field.name
                )
            })?;
        }
        Ok(result)
    }
}

/// Column name index of a result shape, shared by all the dynamic records of that shape.
#[derive(Debug)]
pub struct DynamicIndex {
    names: Box<[String]>,
    positions: HashMap<String, usize>,
}

impl DynamicIndex {
    pub fn new(shape: &RowShape) -> Self {
        let names: Box<[String]> = shape.names.iter().map(|v| v.to_uppercase()).collect();
        let mut positions = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            positions.entry(name.clone()).or_insert(i);
        }
        Self { names, positions }
    }
}

/// Row of an unmapped result, columns are looked up ignoring case.
#[derive(Debug, Clone)]
pub struct DynamicRecord {
    index: Arc<DynamicIndex>,
    values: Box<[Value]>,
}

impl DynamicRecord {
    pub fn new(index: Arc<DynamicIndex>, values: Box<[Value]>) -> Self {
        Self { index, values }
    }
    /// Upper-cased column names.
    pub fn names(&self) -> &[String] {
        &self.index.names
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index
            .positions
            .get(&name.to_uppercase())
            .map(|i| &self.values[*i])
    }
    /// Column converted through the coercion rules of `T`, `None` when absent or NULL.
    pub fn get_as<T: AsValue>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name) {
            Some(value) if !value.is_null() => T::try_from_value(value.clone()).map(Some),
            _ => Ok(None),
        }
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type Compiled = Arc<dyn Any + Send + Sync>;

/// Compiled marshallers keyed by target type and result shape. Entries are only ever added.
#[derive(Default)]
pub struct MarshallerCache {
    entries: RwLock<HashMap<(TypeId, bool), HashMap<RowShape, Compiled>>>,
    compiled: AtomicUsize,
    hits: AtomicUsize,
}

impl MarshallerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_entity<E: Entity>(
        &self,
        table: &TableDescriptor,
        shape: &RowShape,
    ) -> Arc<Marshaller<E>> {
        self.get_or_compile(TypeId::of::<E>(), true, shape, || {
            Marshaller::<E>::compile_mapped(table, shape)
        })
    }

    pub fn for_record<T: Record>(&self, shape: &RowShape) -> Arc<Marshaller<T>> {
        self.get_or_compile(TypeId::of::<T>(), false, shape, || {
            Marshaller::<T>::compile_plain(shape)
        })
    }

    pub fn dynamic_index(&self, shape: &RowShape) -> Arc<DynamicIndex> {
        self.get_or_compile(TypeId::of::<DynamicRecord>(), false, shape, || {
            DynamicIndex::new(shape)
        })
    }

    /// Routines built so far.
    pub fn compiled_count(&self) -> usize {
        self.compiled.load(Ordering::Relaxed)
    }

    /// Lookups served by a routine already built.
    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    fn get_or_compile<T: Any + Send + Sync>(
        &self,
        type_id: TypeId,
        mapped: bool,
        shape: &RowShape,
        compile: impl FnOnce() -> T,
    ) -> Arc<T> {
        let found = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(type_id, mapped))
            .and_then(|v| v.get(shape))
            .cloned();
        if let Some(found) = found.and_then(|v| v.downcast::<T>().ok()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return found;
        }
        let compiled: Compiled = Arc::new(compile());
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .entry((type_id, mapped))
            .or_default()
            .entry(shape.clone())
            .or_insert_with(|| {
                self.compiled.fetch_add(1, Ordering::Relaxed);
                compiled
            })
            .clone();
        drop(entries);
        match entry.downcast::<T>() {
            Ok(v) => v,
            Err(..) => unreachable!("Marshaller cache entries are keyed by their type"),
        }
    }
}

//! Property lookup by name
//!
//! The compiler resolves `[Name]` references through this seam: an input
//! type declares its readable properties once, and a process-wide cache
//! holds the folded name -> accessor table per type so repeated compiles
//! skip the rebuild.

use std::any::TypeId;
use std::sync::Arc;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::compiler::value::{Value, ValueKind};

/// One readable property of an input type: its name, the kind of value it
/// yields, and the accessor.
pub struct PropertyDef<T: ?Sized> {
    pub name: &'static str,
    pub kind: ValueKind,
    pub get: fn(&T) -> Value,
}

impl<T: ?Sized> Clone for PropertyDef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for PropertyDef<T> {}

/// Input types the compiler can resolve property references against.
///
/// Implementations list their properties once; lookup is case-insensitive.
pub trait PropertySource: Sized + 'static {
    fn properties() -> &'static [PropertyDef<Self>];
}

/// The unit type carries no properties; it serves as the input for
/// constant-only expressions.
impl PropertySource for () {
    fn properties() -> &'static [PropertyDef<Self>] {
        &[]
    }
}

/// Folded-name -> property-index tables, one per input type
static ACCESSOR_CACHE: Lazy<RwLock<AHashMap<TypeId, Arc<AHashMap<String, usize>>>>> =
    Lazy::new(|| RwLock::new(AHashMap::new()));

/// Resolve a property by name through the per-type accessor cache
pub(crate) fn find_property<T: PropertySource>(name: &str) -> Option<PropertyDef<T>> {
    let table = accessor_table::<T>();
    table
        .get(&name.to_ascii_lowercase())
        .map(|&index| T::properties()[index])
}

fn accessor_table<T: PropertySource>() -> Arc<AHashMap<String, usize>> {
    let key = TypeId::of::<T>();
    {
        let cache = ACCESSOR_CACHE.read();
        if let Some(table) = cache.get(&key) {
            return table.clone();
        }
    }

    let mut table = AHashMap::with_capacity(T::properties().len());
    for (index, def) in T::properties().iter().enumerate() {
        table.insert(def.name.to_ascii_lowercase(), index);
    }
    let table = Arc::new(table);

    let mut cache = ACCESSOR_CACHE.write();
    cache.entry(key).or_insert_with(|| table.clone()).clone()
}

/// Number of input types with a cached accessor table
#[allow(dead_code)]
pub(crate) fn cached_type_count() -> usize {
    ACCESSOR_CACHE.read().len()
}

//! Field resolution and the per-type descriptor cache.
//!
//! [`resolve`] turns a record type's declared fields into the [`FieldSet`] the
//! builders and the row materializer work from. The result is computed once per
//! type and shared process-wide.

use crate::record::{FieldDecl, Record};
use heck::ToSnakeCase;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// A resolved column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub column: String,
    /// Identifiers leading from the record to the field.
    pub path: Vec<&'static str>,
    pub json: bool,
}

impl FieldDescriptor {
    /// The field path in the form the record accessors take.
    pub fn path(&self) -> &[&'static str] {
        &self.path
    }
}

/// All resolved columns of one record type, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<FieldDescriptor>,
    by_column: HashMap<String, usize>,
}

impl FieldSet {
    pub fn get(&self, column: &str) -> Option<&FieldDescriptor> {
        self.by_column.get(column).map(|&i| &self.fields[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column names, in declaration order.
    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.column.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Default column name for a Rust identifier: lower snake case, one separator per
/// uppercase run (`UserID` -> `user_id`, `ABCField` -> `abc_field`).
///
/// Existing underscores are kept as written, so `type_`, `_hidden` and `a__b` map to
/// themselves and never collide with `type`, `hidden` or `a_b`.
pub fn to_column_name(ident: &str) -> String {
    ident
        .split('_')
        .map(|segment| segment.to_snake_case())
        .collect::<Vec<_>>()
        .join("_")
}

type Cache = RwLock<HashMap<TypeId, Arc<FieldSet>>>;

fn cache() -> &'static Cache {
    static CACHE: OnceLock<Cache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Resolve (or fetch the cached) field set of `R`.
pub fn resolve<R: Record>() -> Arc<FieldSet> {
    let key = TypeId::of::<R>();

    // Resolution is pure, so a poisoned lock still holds consistent data.
    if let Some(fields) = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Arc::clone(fields);
    }

    let mut map = cache().write().unwrap_or_else(PoisonError::into_inner);
    if let Some(fields) = map.get(&key) {
        return Arc::clone(fields);
    }
    let fields = Arc::new(build_field_set(&R::declared_fields()));
    tracing::trace!(
        target: "daorm.resolver",
        record = std::any::type_name::<R>(),
        columns = fields.len(),
        "resolved record fields"
    );
    map.insert(key, Arc::clone(&fields));
    fields
}

/// Number of record types resolved so far.
pub fn cached_types() -> usize {
    cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .len()
}

/// Build a field set from declared fields without touching the cache.
pub fn build_field_set(decls: &[FieldDecl]) -> FieldSet {
    let mut set = FieldSet::default();
    // depth of the descriptor currently owning each column
    let mut depths: Vec<usize> = Vec::new();
    collect(decls, &mut Vec::new(), 0, &mut set, &mut depths);
    set
}

fn collect(
    decls: &[FieldDecl],
    prefix: &mut Vec<&'static str>,
    depth: usize,
    set: &mut FieldSet,
    depths: &mut Vec<usize>,
) {
    for decl in decls {
        if decl.skip {
            continue;
        }

        if let Some(embedded) = decl.embedded {
            prefix.push(decl.ident);
            collect(&embedded(), prefix, depth + 1, set, depths);
            prefix.pop();
            continue;
        }

        let column = match decl.column {
            Some(column) => column.to_string(),
            None => to_column_name(decl.ident),
        };
        let mut path = prefix.clone();
        path.push(decl.ident);
        let descriptor = FieldDescriptor {
            column: column.clone(),
            path,
            json: decl.requires_json(),
        };

        match set.by_column.get(&column) {
            // Deeper (embedded) fields win; at equal depth the later one wins.
            Some(&i) if depths[i] > depth => {}
            Some(&i) => {
                set.fields[i] = descriptor;
                depths[i] = depth;
            }
            None => {
                set.by_column.insert(column, set.fields.len());
                set.fields.push(descriptor);
                depths.push(depth);
            }
        }
    }
}

//! Per-entity capability tables for hydrating partial projections.
//!
//! An [`EntitySchema`] maps external field names to setters. Projection rows
//! are written into a `Default` entity through these setters, keyed by the
//! last path segment of each requested field. Fields inherited from a base
//! type are reached through a parent schema and an accessor to the embedded
//! base value.
//!
//! ```rust
//! use sift_query::{Entity, EntitySchema, FilterValue, entity_schema};
//!
//! #[derive(Debug, Default)]
//! struct Base {
//!     id: i64,
//! }
//!
//! impl Entity for Base {
//!     const ENTITY_NAME: &'static str = "Base";
//!     fn schema() -> &'static EntitySchema<Self> {
//!         entity_schema!(Base { id })
//!     }
//! }
//!
//! #[derive(Debug, Default)]
//! struct Produto {
//!     base: Base,
//!     nome: String,
//!     preco_venda: Option<f64>,
//! }
//!
//! impl Entity for Produto {
//!     const ENTITY_NAME: &'static str = "Produto";
//!     fn schema() -> &'static EntitySchema<Self> {
//!         entity_schema!(Produto { nome, preco_venda as "precoVenda" } extends base: Base)
//!     }
//! }
//!
//! let schema = Produto::schema();
//! assert!(schema.has_field("precoVenda"));
//! assert!(schema.has_field("id"));
//!
//! let mut p = Produto::default();
//! schema.set(&mut p, "id", FilterValue::BigInt(9)).unwrap();
//! assert_eq!(p.base.id, 9);
//! ```

use std::fmt;

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{QueryError, QueryResult};
use crate::filter::{FilterValue, ValueError};
use crate::traits::Entity;

/// Writes one value into one field of an entity.
pub type Setter<E> = fn(&mut E, FilterValue) -> Result<(), ValueError>;

type ParentHas = Box<dyn Fn(&str) -> bool + Send + Sync>;
type ParentSet<E> = Box<dyn Fn(&mut E, &str, FilterValue) -> Result<bool, ValueError> + Send + Sync>;
type ParentNames = Box<dyn Fn() -> Vec<&'static str> + Send + Sync>;

struct Parent<E> {
    name: &'static str,
    has: ParentHas,
    set: ParentSet<E>,
    names: ParentNames,
}

/// Settable-by-name field table for an entity type.
pub struct EntitySchema<E: 'static> {
    entity: &'static str,
    fields: IndexMap<&'static str, Setter<E>>,
    parents: Vec<Parent<E>>,
}

impl<E: 'static> EntitySchema<E> {
    /// Start building a schema for the named entity.
    pub fn builder(entity: &'static str) -> SchemaBuilder<E> {
        SchemaBuilder {
            schema: Self {
                entity,
                fields: IndexMap::new(),
                parents: Vec::new(),
            },
        }
    }

    /// The entity name this schema describes.
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Check whether the field is settable here or on any parent.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.parents.iter().any(|p| (p.has)(name))
    }

    /// Set a field by name.
    ///
    /// Returns `Ok(false)` when no schema in the chain has the field.
    pub fn set(&self, entity: &mut E, name: &str, value: FilterValue) -> Result<bool, ValueError> {
        if let Some(setter) = self.fields.get(name) {
            setter(entity, value)?;
            return Ok(true);
        }
        for parent in &self.parents {
            if (parent.has)(name) {
                return (parent.set)(entity, name, value);
            }
        }
        Ok(false)
    }

    /// Every settable field name, own fields first, then parents.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.fields.keys().copied().collect();
        for parent in &self.parents {
            names.extend((parent.names)());
        }
        names
    }

    /// Build an entity from a projection row.
    ///
    /// `fields` are the requested projection paths, matched positionally
    /// against `row`. Each value is written through the setter named by the
    /// last path segment. Fields with no setter are skipped with a warning.
    pub fn hydrate(&self, fields: &[String], row: Vec<FilterValue>) -> QueryResult<E>
    where
        E: Default,
    {
        if fields.len() != row.len() {
            return Err(QueryError::internal(format!(
                "projection of {} field(s) returned {} column(s)",
                fields.len(),
                row.len()
            ))
            .with_entity(self.entity));
        }

        let mut entity = E::default();
        for (path, value) in fields.iter().zip(row) {
            let name = last_segment(path);
            match self.set(&mut entity, name, value) {
                Ok(true) => {}
                Ok(false) => {
                    warn!(entity = self.entity, field = %path, "Projection field has no setter, skipping");
                }
                Err(e) => {
                    return Err(QueryError::hydration(self.entity, name, e.to_string()).with_source(e));
                }
            }
        }
        Ok(entity)
    }
}

impl<E: 'static> fmt::Debug for EntitySchema<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("entity", &self.entity)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("parents", &self.parents.iter().map(|p| p.name).collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`EntitySchema`].
pub struct SchemaBuilder<E: 'static> {
    schema: EntitySchema<E>,
}

impl<E: 'static> SchemaBuilder<E> {
    /// Register a settable field.
    pub fn field(mut self, name: &'static str, setter: Setter<E>) -> Self {
        self.schema.fields.insert(name, setter);
        self
    }

    /// Inherit the fields of `P`, stored inside `E` at `accessor`.
    pub fn parent<P: Entity>(mut self, accessor: fn(&mut E) -> &mut P) -> Self {
        self.schema.parents.push(Parent {
            name: P::ENTITY_NAME,
            has: Box::new(|name: &str| P::schema().has_field(name)),
            set: Box::new(move |entity: &mut E, name: &str, value: FilterValue| {
                P::schema().set(accessor(entity), name, value)
            }),
            names: Box::new(|| P::schema().field_names()),
        });
        self
    }

    /// Finish the schema.
    pub fn build(self) -> EntitySchema<E> {
        self.schema
    }
}

/// The last `.`-separated segment of a field path.
pub(crate) fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Build and cache an [`EntitySchema`] for a concrete entity type.
///
/// Expands to a `&'static EntitySchema<T>` backed by a `OnceLock`, so it is
/// meant to be the body of [`Entity::schema`]. The type must be named
/// explicitly (`Self` is not allowed inside the generated static).
///
/// Fields are set through [`FromValue`](crate::FromValue). A field can be
/// exposed under a different name with `field as "name"`, and a base type
/// embedded in a field is inherited with `extends field: Type`.
#[macro_export]
macro_rules! entity_schema {
    ($entity:ident { $($field:ident $(as $alias:literal)?),* $(,)? } $(extends $parent:ident : $pty:ty)?) => {{
        static SCHEMA: ::std::sync::OnceLock<$crate::EntitySchema<$entity>> =
            ::std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| {
            $crate::EntitySchema::<$entity>::builder(<$entity as $crate::Entity>::ENTITY_NAME)
                $(.field($crate::__schema_field_name!($field $(, $alias)?), |e: &mut $entity, v| {
                    e.$field = $crate::FromValue::from_value(v)?;
                    Ok(())
                }))*
                $(.parent::<$pty>(|e: &mut $entity| &mut e.$parent))?
                .build()
        })
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __schema_field_name {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident, $alias:literal) => {
        $alias
    };
}

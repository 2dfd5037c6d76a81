//! # Sift
//!
//! Injection-resistant query building and untrusted filter decoding.
//!
//! Sift provides:
//! - A fluent query builder that keeps values out of query text
//! - A decoder for `field|CONDITION|value` filter tokens taken from URLs
//! - Identifier whitelisting and free-text sanitization
//! - Axum extractors and error responses (feature `axum`, on by default)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sift::prelude::*;
//!
//! #[derive(Debug, Default)]
//! pub struct Produto {
//!     pub id: i64,
//!     pub nome: String,
//!     pub ativo: bool,
//! }
//!
//! entity_schema!(Produto { id, nome, ativo });
//!
//! async fn ativos(dao: &Dao<MyEngine>, tokens: Vec<String>) -> QueryResult<Vec<Produto>> {
//!     let mut filters = dao.filters(tokens);
//!     filters.allow_only(["nome", "ativo"]);
//!     let mut predicates = PredicateSet::new();
//!     filters.apply_to(&mut predicates);
//!
//!     dao.select()
//!         .from::<Produto>()?
//!         .where_set(&predicates)?
//!         .order_by("nome", true)?
//!         .list()
//!         .await
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use sift_query::*;

/// Axum integration.
#[cfg(feature = "axum")]
#[cfg_attr(docsrs, doc(cfg(feature = "axum")))]
pub mod web {
    pub use sift_axum::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sift_query::prelude::*;

    #[cfg(feature = "axum")]
    pub use sift_axum::{ApiError, DaoState, FilterParams};
}

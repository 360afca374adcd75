//! Tabular data model.
//!
//! - [`Dataset`]: immutable columnar table with optional group boundaries
//! - [`Column`] / [`ColumnValues`]: typed scalar and vector columns
//! - [`Schema`]: explicit per-column descriptor (kind, width, key cardinality)
//! - [`DataView`]: ascending row subset of a shared dataset
//! - [`RoleMappedData`]: dataset with label/feature/weight/group/name bindings

mod column;
mod dataset;
mod roles;
mod schema;
mod view;

pub use column::{Column, ColumnValues, VectorData};
pub use dataset::{Dataset, DatasetError};
pub use roles::{ColumnRole, RoleMappedData, RoleMapping};
pub use schema::{ColumnDescriptor, ColumnKind, Schema, Width};
pub use view::DataView;

//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and a `Deserialize` create DTO for inserts.

pub mod user;

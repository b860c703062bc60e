//! # Route Modules
//!
//! Each module owns one guarded endpoint: its schema, its typed request and
//! echo shapes, its handler and its Axum router. Routers are assembled in
//! [`crate::app`].

pub mod dogs;
pub mod people;

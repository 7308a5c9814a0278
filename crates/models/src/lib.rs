//! Data model shared by the store backends and the HTTP layer:
//! the `Entity` identity contract, the example `Book` entity and the
//! SeaORM table backing the postgres store.

pub mod errors;
pub mod db;
pub mod entity;
pub mod book;
pub mod document;

pub use entity::Entity;

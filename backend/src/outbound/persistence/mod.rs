//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain repository ports backed by
//! PostgreSQL via Diesel with async support through `diesel-async` and `bb8`
//! connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repository implementations only translate between
//!   Diesel models and domain types plus the transactional guarantees their
//!   port contracts promise. No business logic resides here.
//! - **Internal models**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) are internal implementation details, never
//!   exposed to the domain layer.
//! - **Strongly typed errors**: all database errors are mapped to domain
//!   persistence error types.

mod diesel_deadline_repository;
mod diesel_relationship_repository;
mod diesel_user_directory;
mod models;
mod pool;
mod schema;

pub use diesel_deadline_repository::DieselDeadlineRepository;
pub use diesel_relationship_repository::DieselRelationshipRepository;
pub use diesel_user_directory::DieselUserDirectory;
pub use pool::{DbPool, PoolConfig, PoolError};

//! Service layer providing business operations on top of models.
//! - Separates business logic from data access and HTTP.
//! - Reuses validation and entity definitions in `models` crate.
//! - Provides clear error types and documented interfaces.

pub mod errors;
pub mod actor;
pub mod auth;
pub mod bootstrap;
pub mod runtime;
#[cfg(test)]
pub mod test_support;
pub mod storage;
pub mod user_service;
pub mod shop_service;
pub mod product_service;
pub mod cart_service;
pub mod order_service;

pub use actor::Actor;
pub use errors::ServiceError;

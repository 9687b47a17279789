//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, login, token verification and password changes live here;
//! the HTTP layer only moves bytes in and out.

pub mod domain;
pub mod errors;
pub mod password;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::AuthService;

pub mod errors;
pub mod form;
pub mod openapi;
pub mod routes;
pub mod startup;

pub use startup::{build_state, run};

//! Contacts core: domain records, search criteria, the query composer, the
//! persistence port and the lookup service.

pub mod criteria;
pub mod error;
pub mod memory;
pub mod ports;
pub mod query;
pub mod service;
pub mod types;
pub mod validate;

pub use error::{ContactError, FieldError};

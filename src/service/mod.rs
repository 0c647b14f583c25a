//! CrudService: generic CRUD over the store seam.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::RequestValidator;

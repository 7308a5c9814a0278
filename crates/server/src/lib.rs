pub mod errors;
pub mod observability;
pub mod resource;
pub mod response;
pub mod routes;
pub mod startup;

pub use resource::{Registrar, Resource, ResourceRouter};
pub use startup::run;

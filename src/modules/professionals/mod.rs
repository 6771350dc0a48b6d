pub mod models;
pub mod repositories;

pub use models::Professional;
pub use repositories::{MySqlProfessionalDirectory, ProfessionalDirectory};

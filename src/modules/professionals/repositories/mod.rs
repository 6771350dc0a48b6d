pub mod professional_directory;

pub use professional_directory::{MySqlProfessionalDirectory, ProfessionalDirectory};

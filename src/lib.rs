//! Barbershop Commission Engine Library
//!
//! Computes what each professional is owed: rule resolution, commission items,
//! salary advances and the monthly period close that turns them into a payable.

pub mod config;
pub mod core;
pub mod modules;
pub mod state;

// Re-export commonly used types
pub use crate::core::{AppError, Result};
pub use modules::advances;
pub use modules::commissions;
pub use modules::periods;
pub use modules::rules;
pub use state::AppState;

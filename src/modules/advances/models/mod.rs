pub mod advance;

pub use advance::{Advance, AdvanceFilter, AdvanceStatus, CreateAdvanceRequest};

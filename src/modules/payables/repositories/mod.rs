pub mod payable_emitter;

pub use payable_emitter::{MySqlPayableEmitter, PayableEmitter};

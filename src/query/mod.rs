pub mod callers;
pub mod channel;
pub mod class;
pub mod method;

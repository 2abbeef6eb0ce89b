pub mod form;
pub mod revision;
pub mod session;

mod error;
mod validate;

pub use error::PolicyError;
pub use validate::validate;

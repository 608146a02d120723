mod error;
mod lease;
mod request;
mod runner;

pub use error::BronzeError;
pub use request::{BronzeRunOutcome, BronzeRunRequest};
pub use runner::run;

mod bucket;
mod engine;
mod error;
mod keying;
mod model;
mod normalize;
mod quarantine;
mod request;
mod tie_break;

pub use engine::run;
pub use error::SilverError;
pub use request::{SilverLeafOutcome, SilverRunOutcome, SilverRunRequest};

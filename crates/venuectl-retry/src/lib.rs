pub mod engine;
pub mod policy;

pub use engine::{run, AttemptOutcome, AttemptRecord, FinalResult};
pub use policy::RetryPolicy;

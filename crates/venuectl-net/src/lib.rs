pub mod prober;

pub use prober::{Prober, ProberConfig, ProbeResult};

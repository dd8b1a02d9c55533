//! Signal conditioning applied to raw sensor samples.

pub mod median;

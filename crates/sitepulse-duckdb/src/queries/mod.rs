pub mod breakdown;
pub mod realtime;
pub mod stats;
pub mod timeseries;

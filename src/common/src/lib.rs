pub mod cli;
pub mod storage;
pub mod telemetry;

pub(crate) mod bootstrap;
mod location_log;
pub(crate) mod loop_runner;

pub mod config;
pub mod crm;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod record;
pub mod store;
pub mod sync;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub(crate) mod capture;
pub(crate) mod metrics;
pub(crate) mod sidecar;
pub(crate) mod snapshot;

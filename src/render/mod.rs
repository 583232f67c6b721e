pub(crate) mod backend;
pub(crate) mod cpu;
pub(crate) mod device;
pub(crate) mod filters;
#[cfg(feature = "gpu")]
pub(crate) mod gpu;
pub(crate) mod march;
pub(crate) mod noise;
pub(crate) mod opts;
pub(crate) mod pipeline;
pub(crate) mod plan;

pub(crate) mod decode;
pub(crate) mod loader;
pub(crate) mod manifest;
pub(crate) mod store;

pub(crate) mod context;
pub(crate) mod env;
pub(crate) mod host;
pub(crate) mod state;

pub(crate) mod registry;
pub(crate) mod timer;

pub(crate) mod file;
pub(crate) mod model;
pub(crate) mod resolver;
pub(crate) mod schema;

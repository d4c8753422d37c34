pub mod framework;
pub mod logging;
pub mod schema;

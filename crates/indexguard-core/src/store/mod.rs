pub mod database;
pub mod pattern;
pub mod schema;

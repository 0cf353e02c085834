pub mod json;

pub use json::JsonExporter;

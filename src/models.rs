pub mod forms;
pub mod schema;
pub mod wire;

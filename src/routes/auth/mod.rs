mod handler;
mod model;

pub use handler::*;
pub use model::*;

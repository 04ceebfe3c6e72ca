pub mod auth;
pub mod link;
pub mod profile;
pub mod project;
pub mod social;

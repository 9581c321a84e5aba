pub mod api;
pub mod dom;
pub mod endpoints;
pub mod error;
pub mod parse;
pub mod resolver;

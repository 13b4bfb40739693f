pub mod env;
pub mod response;
pub mod text;

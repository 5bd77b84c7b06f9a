pub mod handler;
pub mod model;

pub use handler::{check_token, sign_out};

pub mod handler;

pub use handler::get_user;

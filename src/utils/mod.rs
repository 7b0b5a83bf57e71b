pub mod auth;
pub mod table;

pub use auth::{create_token, verify_password, verify_token};
pub use table::{paginate, search, Page, Searchable};

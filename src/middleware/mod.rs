pub mod session;

pub use session::{get_current_admin, CurrentAdmin, AUTH_COOKIE};

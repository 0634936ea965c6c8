pub mod handlers;
pub mod password;
pub mod token;
pub mod users;

pub use token::{AuthFailure, Claims, TokenIssuer};

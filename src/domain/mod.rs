//! Domain identifier types.

mod id;

pub use id::{TokenId, UserId};

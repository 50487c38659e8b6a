pub mod api;
pub mod auth;
pub mod event;
pub mod limit;

pub use api::*;
pub use auth::*;
pub use event::*;
pub use limit::*;

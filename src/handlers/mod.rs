pub mod auth;
pub mod diagnostics;
pub mod files;
pub mod health;
pub mod members;
pub mod rooms;

pub use auth::*;
pub use diagnostics::*;
pub use files::*;
pub use health::*;
pub use members::*;
pub use rooms::*;

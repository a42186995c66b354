pub mod diagnostics;
pub mod error;
pub mod events;
pub mod health;
pub mod member_update;
pub mod membership;
pub mod room;
pub mod room_create;
pub mod room_delete;
pub mod room_file;
pub mod room_join;
pub mod room_snapshot;
pub mod user;

pub use diagnostics::*;
pub use error::*;
pub use events::*;
pub use health::*;
pub use member_update::*;
pub use membership::*;
pub use room::*;
pub use room_create::*;
pub use room_delete::*;
pub use room_file::*;
pub use room_join::*;
pub use room_snapshot::*;
pub use user::*;

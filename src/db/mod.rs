pub mod dbrooms;
pub mod memory;
pub mod store;

pub use dbrooms::PgStore;
pub use memory::MemoryStore;
pub use store::{RoomField, RoomStore, StoreError, UserField, UserStore};

pub mod activity_log;
pub mod gas;
pub mod nonce_manager;

pub use activity_log::*;
pub use gas::*;
pub use nonce_manager::*;

pub mod common;
pub mod decode;
pub mod dispatch;
pub mod fs_handlers;
pub mod process_handlers;
pub mod raw;
pub mod ui_handlers;

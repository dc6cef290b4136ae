pub mod action_items;
pub mod app;
pub mod assistant;
pub mod debounce;
pub mod grouping;
pub mod managers;
pub mod search;
pub mod settings;
pub mod storage;
pub mod transfer;

pub use action_items::ActionItem;
pub use app::App;
pub use grouping::{Direction, GroupView};
pub use managers::meeting::{Meeting, MeetingManager, MeetingUpdate};
pub use managers::reminder::Reminder;
pub use storage::json_file::JsonFileStore;
pub use storage::KeyValueStore;

/// Called once by the embedding shell before anything else.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

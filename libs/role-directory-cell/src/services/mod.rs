pub mod directory;
pub mod watcher;

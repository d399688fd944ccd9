pub mod core_api;
pub mod decoder;
pub mod extract;
pub mod layout;
pub mod mode;
pub mod reader;
pub mod settings;
pub mod sniff;
pub mod store;
pub mod watch;

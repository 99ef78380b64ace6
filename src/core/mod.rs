pub mod catalog;
pub mod merger;
pub mod messages;
pub mod portrait;
pub mod recipient;

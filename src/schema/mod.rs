pub mod audio;
pub mod change_map;
pub mod crew;
pub mod document;

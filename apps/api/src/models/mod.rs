pub mod posting;
pub mod preference;
pub mod title;

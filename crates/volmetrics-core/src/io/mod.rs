pub mod npy;
pub mod npy_writer;
pub mod volume;

pub use volume::{SliceAxes, Volume};

pub mod snapshot;
pub mod video;

pub use snapshot::VideoSnapshot;
pub use video::Video;

pub mod asset;
pub mod imagen;
pub mod request;

pub use asset::*;
pub use imagen::GeneratedImage;
pub use request::*;

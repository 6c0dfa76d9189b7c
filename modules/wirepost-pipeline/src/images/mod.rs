pub mod balancer;
pub mod feed_images;
pub mod picker;
pub mod scorer;

pub use balancer::SourceBalancer;
pub use picker::ImagePicker;

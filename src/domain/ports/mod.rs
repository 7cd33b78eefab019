mod disk_tier_port;
mod image_decoder_port;
mod memory_tier_port;
mod origin_port;

pub use disk_tier_port::DiskTierPort;
pub use image_decoder_port::ImageDecoderPort;
pub use memory_tier_port::MemoryTierPort;
pub use origin_port::OriginPort;

#[cfg(test)]
pub use origin_port::MockOriginPort;

//! Core data structures shared by the encoders, renderer and decode pipeline

pub mod decode_result;
pub mod matrix;
pub mod module_matrix;
pub mod pixel_buffer;
pub mod point;
pub mod qr;
pub mod symbology;

pub use decode_result::{DecodeResult, SymbolSize};
pub use matrix::BitMatrix;
pub use module_matrix::{Module, ModuleMatrix};
pub use pixel_buffer::{PixelBuffer, PixelFormat};
pub use point::Point;
pub use qr::{ECLevel, MaskPattern, Version};
pub use symbology::Symbology;

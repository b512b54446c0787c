pub mod paper;
pub mod question;

pub use paper::{ExtractionResult, FilterCategory, PaperRef};
pub use question::{ExtractionItem, ImageRef, Material, MaterialGroup, Question};

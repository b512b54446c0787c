//! 抽取层：清洗 → 解析 → 轮询

pub mod extractor;
pub mod normalizer;
pub mod poller;

pub use extractor::{classify_section, parse_items, parse_question, SectionKind};
pub use normalizer::{normalize, normalize_element};
pub use poller::{is_complete, ContainerReader, ExtractionPoller, SurfaceContainerReader};

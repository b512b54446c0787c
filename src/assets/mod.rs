pub mod resolver;

pub use resolver::{absolute_url, file_name_for, rewrite_links, AssetResolver};

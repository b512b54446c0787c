//! 基础设施层：持有稀缺资源（Page、HTTP 客户端），只暴露能力

pub mod chromium;
pub mod fetcher;
pub mod surface;

#[cfg(test)]
pub(crate) mod fake;

pub use chromium::{ChromiumElement, ChromiumProvider, ChromiumSurface};
pub use fetcher::SessionFetcher;
pub use surface::{
    AssetFetcher, BrowsingSurface, ElementHandle, FetchResponse, LoadState, SelectorState,
    SurfaceProvider,
};

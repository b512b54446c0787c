//! # Fenbi Crawler
//!
//! 并发抓取粉笔真题解析页，保存为 JSON 并下载图片
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page、HTTP 客户端），只暴露能力
//! - `BrowsingSurface` / `ElementHandle` - 浏览能力
//! - `AssetFetcher` - 与页面共享会话的下载能力
//!
//! ### ② 能力层
//! - `extraction/` - HTML 清洗、题目抽取、解析页轮询
//! - `assets/` - 图片下载与引用改写
//! - `navigation/` - 列表页操作与单张试卷的导航状态机
//! - `storage/` - JSON 落盘
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 应用入口，每个分类一个任务
//! - `orchestrator/filter_task` - 分类任务，受并发闸门与导航锁约束
//! - `orchestrator/paper_processor` - 单张试卷处理器
//!
//! ## 模块结构

pub mod assets;
pub mod browser;
pub mod config;
pub mod error;
pub mod extraction;
pub mod infrastructure;
pub mod models;
pub mod navigation;
pub mod orchestrator;
pub mod storage;
pub mod utils;

// 重新导出常用类型
pub use assets::AssetResolver;
pub use config::Config;
pub use error::{CrawlerError, Result};
pub use extraction::{normalize, parse_items, ExtractionPoller};
pub use models::{ExtractionItem, ExtractionResult, FilterCategory, Question};
pub use orchestrator::{run_filters, App, Coordination, TaskStats};
pub use storage::JsonStore;

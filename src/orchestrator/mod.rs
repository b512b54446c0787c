//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责并发调度和流程串联，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 多分类并发处理器
//! - 管理应用生命周期（连接浏览器、打开列表页、等待登录、发现分类）
//! - 每个分类一个 tokio 任务
//! - 注入协调对象（并发闸门 + 导航锁）
//! - 输出全局统计信息
//!
//! ### `filter_task` - 分类任务
//! - 独占一个页面，按顺序遍历分类下的试卷
//! - 每张试卷之后回到列表页
//! - 捕获单张试卷的错误，继续下一张
//!
//! ### `paper_processor` - 单张试卷处理器
//! - 导航 → 抽取 → 图片 → 落盘
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<FilterCategory>)
//!     ↓
//! filter_task (处理一个分类下的所有试卷)
//!     ↓
//! paper_processor (处理一张试卷)
//!     ↓
//! navigation / extraction / assets / storage
//!     ↓
//! infrastructure (BrowsingSurface / AssetFetcher)
//! ```

pub mod batch_processor;
pub mod filter_task;
pub mod paper_processor;

// 重新导出主要类型
pub use batch_processor::{run_filters, App};
pub use filter_task::{Coordination, FilterTask, TaskSettings, TaskStats};
pub use paper_processor::{PaperCtx, PaperOutcome, PaperProcessor};

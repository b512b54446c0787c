//! 内存中的假页面，按选择器模拟列表页 / 考试页 / 解析页

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::surface::{
    AssetFetcher, BrowsingSurface, ElementHandle, FetchResponse, LoadState, SurfaceProvider,
};
use crate::error::{CrawlerError, Result};

pub const LIST_URL: &str = "https://fake.test/list";

/// 默认的解析页内容：一道带解析的题
pub const ANALYSIS_MARKUP: &str = r#"<div class="tis-container"><div class="ti"><div class="ti-container">
    <div class="ti-content">题干<img src="//img.fake.test/q.png"></div>
    <app-solution-title><div class="solution-title-container">解析</div></app-solution-title>
    <div class="solution-content"><p>因为所以</p></div>
</div></div></div>"#;

/// 点击试卷后出现的页面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opens {
    /// 考试页；`confirm_works` 为 false 时确认后停留在原页面
    Exam {
        submit_visible: bool,
        confirm_works: bool,
    },
    /// 之前做过，直接进入解析页
    Analysis,
    /// 起初什么都没有，过一会儿才出现解析标记
    LateAnalysis,
    /// 始终空白
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    List,
    Exam { submit_visible: bool, confirm_works: bool },
    Analysis,
    Blank { late_analysis: bool },
}

#[derive(Debug, Clone)]
pub struct FakePaper {
    pub title: Option<String>,
    pub opens: Opens,
}

impl FakePaper {
    pub fn new(title: &str, opens: Opens) -> Self {
        Self {
            title: Some(title.to_string()),
            opens,
        }
    }
}

/// 页面蓝本，每个新页面都从它复制
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub filters: Vec<String>,
    pub papers: Vec<FakePaper>,
    pub analysis_markup: String,
    pub body_text: String,
    /// 第 n 次（从 0 开始）查询试卷行时返回错误
    pub failing_paper_queries: Vec<usize>,
}

impl Blueprint {
    pub fn new(filters: &[&str], papers: Vec<FakePaper>) -> Self {
        Self {
            filters: filters.iter().map(|f| f.to_string()).collect(),
            papers,
            analysis_markup: ANALYSIS_MARKUP.to_string(),
            body_text: "请登录后继续".to_string(),
            failing_paper_queries: Vec::new(),
        }
    }
}

/// 跨页面共享的并发计数
#[derive(Debug, Default)]
pub struct Counters {
    entering_now: AtomicUsize,
    pub max_entering: AtomicUsize,
    open_now: AtomicUsize,
    pub max_open: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl Counters {
    fn bump(now: &AtomicUsize, max: &AtomicUsize) {
        let current = now.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(current, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct FakeState {
    screen: Screen,
    url: String,
    filters: Vec<(String, bool)>,
    papers: Vec<FakePaper>,
    confirm_shown: bool,
    late_polls: usize,
    entering: bool,
    analysis_markup: String,
    body_text: String,
    clicks: Vec<String>,
    navigations: Vec<String>,
    paper_queries: usize,
    failing_paper_queries: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Filter(usize),
    Paper(usize),
    Submit,
    Confirm,
    SolutionTitle,
    QuestionContainer,
}

/// 假页面
#[derive(Clone)]
pub struct FakeSurface {
    state: Arc<Mutex<FakeState>>,
    counters: Arc<Counters>,
}

impl FakeSurface {
    pub fn new(blueprint: &Blueprint, counters: Arc<Counters>) -> Self {
        let state = FakeState {
            screen: Screen::Blank {
                late_analysis: false,
            },
            url: "about:blank".to_string(),
            filters: blueprint.filters.iter().map(|f| (f.clone(), false)).collect(),
            papers: blueprint.papers.clone(),
            confirm_shown: false,
            late_polls: 0,
            entering: false,
            analysis_markup: blueprint.analysis_markup.clone(),
            body_text: blueprint.body_text.clone(),
            clicks: Vec::new(),
            navigations: Vec::new(),
            paper_queries: 0,
            failing_paper_queries: blueprint.failing_paper_queries.clone(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            counters,
        }
    }

    /// 直接停在列表页
    pub fn at_list(blueprint: &Blueprint) -> Self {
        let surface = Self::new(blueprint, Arc::new(Counters::default()));
        {
            let mut state = surface.state.lock().unwrap();
            state.screen = Screen::List;
            state.url = LIST_URL.to_string();
        }
        surface
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn active_filter(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .filters
            .iter()
            .find(|(_, active)| *active)
            .map(|(name, _)| name.clone())
    }

    pub fn clear_papers(&self) {
        self.state.lock().unwrap().papers.clear();
    }

    fn element(&self, kind: Kind) -> FakeElement {
        FakeElement {
            state: Arc::clone(&self.state),
            counters: Arc::clone(&self.counters),
            kind,
        }
    }
}

#[async_trait]
impl BrowsingSurface for FakeSurface {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        state.url = url.to_string();
        state.confirm_shown = false;
        state.screen = if url.starts_with(LIST_URL) {
            Screen::List
        } else {
            Screen::Blank {
                late_analysis: false,
            }
        };
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        Ok(())
    }

    async fn wait_for_load(&self, _state: LoadState, _timeout: Duration) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let mut state = self.state.lock().unwrap();
        if state.entering {
            state.entering = false;
            self.counters.entering_now.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Vec<FakeElement>> {
        let kinds: Vec<Kind> = {
            let mut state = self.state.lock().unwrap();
            if selector == "div.paper-item" {
                let nth = state.paper_queries;
                state.paper_queries += 1;
                if state.failing_paper_queries.contains(&nth) {
                    return Err(CrawlerError::Script("node detached".to_string()));
                }
            }
            let screen = state.screen;
            match (selector, screen) {
                ("span.categories-item", Screen::List) => {
                    (0..state.filters.len()).map(Kind::Filter).collect()
                }
                ("div.paper-item", Screen::List) => {
                    (0..state.papers.len()).map(Kind::Paper).collect()
                }
                ("div.submit-btn", Screen::Exam { .. }) => vec![Kind::Submit],
                ("button.btn-submit", Screen::Exam { .. }) if state.confirm_shown => {
                    vec![Kind::Confirm]
                }
                (".solution-title", Screen::Analysis) => vec![Kind::SolutionTitle],
                (".solution-title", Screen::Blank { late_analysis: true }) => {
                    state.late_polls += 1;
                    if state.late_polls >= 2 {
                        vec![Kind::SolutionTitle]
                    } else {
                        Vec::new()
                    }
                }
                (".ti-container", Screen::Analysis) => vec![Kind::QuestionContainer],
                _ => Vec::new(),
            }
        };
        Ok(kinds.into_iter().map(|kind| self.element(kind)).collect())
    }

    async fn evaluate(&self, script: &str) -> Result<JsonValue> {
        let state = self.state.lock().unwrap();
        if script.contains("tis-container") {
            let markup = match state.screen {
                Screen::Analysis => state.analysis_markup.clone(),
                _ => "<body></body>".to_string(),
            };
            Ok(JsonValue::String(markup))
        } else if script.contains("innerText") {
            Ok(JsonValue::String(state.body_text.clone()))
        } else {
            Err(CrawlerError::Script(format!("unsupported script: {}", script)))
        }
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn close(&self) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.counters.open_now.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 假元素，始终指向所属页面的当前状态
pub struct FakeElement {
    state: Arc<Mutex<FakeState>>,
    counters: Arc<Counters>,
    kind: Kind,
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn text(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        Ok(match self.kind {
            Kind::Filter(i) => state.filters.get(i).map(|(n, _)| n.clone()).unwrap_or_default(),
            Kind::Paper(i) => state
                .papers
                .get(i)
                .and_then(|p| p.title.clone())
                .unwrap_or_default(),
            Kind::SolutionTitle => "解析".to_string(),
            _ => String::new(),
        })
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        match (self.kind, name) {
            (Kind::Filter(i), "class") => Ok(state.filters.get(i).map(|(_, active)| {
                if *active {
                    "categories-item active".to_string()
                } else {
                    "categories-item".to_string()
                }
            })),
            _ => Ok(None),
        }
    }

    async fn is_visible(&self) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(match (self.kind, state.screen) {
            (Kind::Submit, Screen::Exam { submit_visible, .. }) => submit_visible,
            _ => true,
        })
    }

    async fn click(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match self.kind {
            Kind::Filter(i) => {
                let name = state.filters[i].0.clone();
                for (index, filter) in state.filters.iter_mut().enumerate() {
                    filter.1 = index == i;
                }
                state.clicks.push(format!("filter:{}", name));
            }
            Kind::Paper(i) => {
                let opens = state
                    .papers
                    .get(i)
                    .map(|p| p.opens)
                    .ok_or_else(|| CrawlerError::ElementNotFound(format!("paper {}", i)))?;
                state.clicks.push(format!("paper:{}", i));
                state.confirm_shown = false;
                state.late_polls = 0;
                state.url = format!("https://fake.test/exam/{}", i);
                state.screen = match opens {
                    Opens::Exam {
                        submit_visible,
                        confirm_works,
                    } => Screen::Exam {
                        submit_visible,
                        confirm_works,
                    },
                    Opens::Analysis => {
                        state.url = format!("https://fake.test/exam/solution/{}", i);
                        Screen::Analysis
                    }
                    Opens::LateAnalysis => Screen::Blank {
                        late_analysis: true,
                    },
                    Opens::Blank => Screen::Blank {
                        late_analysis: false,
                    },
                };
                state.entering = true;
                Counters::bump(&self.counters.entering_now, &self.counters.max_entering);
            }
            Kind::Submit => {
                state.clicks.push("submit".to_string());
                state.confirm_shown = true;
            }
            Kind::Confirm => {
                state.clicks.push("confirm".to_string());
                if let Screen::Exam {
                    confirm_works: true,
                    ..
                } = state.screen
                {
                    state.screen = Screen::Analysis;
                    state.url = state.url.replace("/exam/", "/exam/solution/");
                }
            }
            Kind::SolutionTitle | Kind::QuestionContainer => {}
        }
        Ok(())
    }

    async fn child_text(&self, selector: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        match (self.kind, selector) {
            (Kind::Paper(i), "div.item-info-title") => {
                Ok(state.papers.get(i).and_then(|p| p.title.clone()))
            }
            _ => Ok(None),
        }
    }
}

/// 假下载器：任何地址都返回 200
#[derive(Default)]
pub struct FakeFetcher {
    pub requests: Mutex<Vec<String>>,
}

#[async_trait]
impl AssetFetcher for FakeFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(FetchResponse {
            status: 200,
            body: url.as_bytes().to_vec(),
        })
    }
}

/// 按蓝本开新页面，并记录并发情况
pub struct FakeProvider {
    blueprint: Blueprint,
    pub counters: Arc<Counters>,
    surfaces: Mutex<Vec<FakeSurface>>,
    failing_opens: Mutex<HashSet<usize>>,
    panic_fetcher: AtomicBool,
}

impl FakeProvider {
    pub fn new(blueprint: Blueprint) -> Self {
        Self {
            blueprint,
            counters: Arc::new(Counters::default()),
            surfaces: Mutex::new(Vec::new()),
            failing_opens: Mutex::new(HashSet::new()),
            panic_fetcher: AtomicBool::new(false),
        }
    }

    /// 第 n 次（从 0 开始）开页面时失败
    pub fn fail_open(&self, nth: usize) {
        self.failing_opens.lock().unwrap().insert(nth);
    }

    /// 创建下载器时 panic
    pub fn panic_in_fetcher(&self) {
        self.panic_fetcher.store(true, Ordering::SeqCst);
    }

    pub fn surfaces(&self) -> Vec<FakeSurface> {
        self.surfaces.lock().unwrap().clone()
    }
}

#[async_trait]
impl SurfaceProvider for FakeProvider {
    type Surface = FakeSurface;
    type Fetcher = FakeFetcher;

    async fn open_surface(&self) -> Result<FakeSurface> {
        let nth = self.counters.opened.fetch_add(1, Ordering::SeqCst);
        if self.failing_opens.lock().unwrap().contains(&nth) {
            return Err(CrawlerError::Browser("标签页创建失败".to_string()));
        }
        Counters::bump(&self.counters.open_now, &self.counters.max_open);
        let surface = FakeSurface::new(&self.blueprint, Arc::clone(&self.counters));
        self.surfaces.lock().unwrap().push(surface.clone());
        Ok(surface)
    }

    async fn session_fetcher(&self, _surface: &FakeSurface) -> Result<FakeFetcher> {
        if self.panic_fetcher.load(Ordering::SeqCst) {
            panic!("fetcher construction blew up");
        }
        Ok(FakeFetcher::default())
    }
}

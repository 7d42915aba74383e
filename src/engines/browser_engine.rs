// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{EngineError, FetchRequest, FetchedPage, PageFetcher};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{BrowserContextId, CloseParams};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, Headers,
    SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::listeners::EventStream;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// 默认网络空闲判定时长
pub const DEFAULT_NETWORK_IDLE: Duration = Duration::from_millis(500);
/// 默认导航完成后的额外等待时长
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(2000);

/// 浏览器启动选项
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// 远程调试地址，设置后连接已有的 Chrome 而不是启动新进程
    pub remote_debugging_url: Option<String>,
    /// Chrome 可执行文件路径
    pub chrome_executable: Option<PathBuf>,
    /// 无请求在途多久视为网络空闲
    pub network_idle: Duration,
    /// 网络空闲后的额外等待，给客户端渲染留出时间
    pub settle_delay: Duration,
    /// CDP 命令超时
    pub request_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            remote_debugging_url: None,
            chrome_executable: None,
            network_idle: DEFAULT_NETWORK_IDLE,
            settle_delay: DEFAULT_SETTLE_DELAY,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// 浏览器引擎
///
/// 基于chromiumoxide实现的页面抓取器。整个运行期间共享一个浏览器进程，
/// 每个请求使用独立的浏览器上下文，互不共享 cookie 与存储。
pub struct BrowserEngine {
    browser: Arc<Browser>,
    handler_task: JoinHandle<()>,
    remote: bool,
    network_idle: Duration,
    settle_delay: Duration,
}

impl BrowserEngine {
    /// 启动或连接浏览器
    ///
    /// # 参数
    ///
    /// * `options` - 浏览器启动选项
    ///
    /// # 返回值
    ///
    /// * `Ok(BrowserEngine)` - 可用的浏览器引擎
    /// * `Err(EngineError)` - 浏览器启动或连接失败
    pub async fn launch(options: &BrowserOptions) -> Result<Self, EngineError> {
        let (browser, mut handler) = if let Some(ref url) = options.remote_debugging_url {
            info!("Connecting to remote Chrome instance at: {}", url);
            Browser::connect(url).await.map_err(|e| {
                EngineError::FetchError(format!("Failed to connect to remote Chrome: {}", e))
            })?
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(options.request_timeout)
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage");
            if let Some(ref path) = options.chrome_executable {
                builder = builder.chrome_executable(path);
            }

            let config = builder
                .build()
                .map_err(|e| EngineError::FetchError(format!("Invalid browser config: {}", e)))?;
            Browser::launch(config)
                .await
                .map_err(|e| EngineError::FetchError(format!("Failed to launch Chrome: {}", e)))?
        };

        // The handler must be polled for the browser connection to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            handler_task,
            remote: options.remote_debugging_url.is_some(),
            network_idle: options.network_idle,
            settle_delay: options.settle_delay,
        })
    }

    /// 关闭浏览器并停止事件处理任务
    ///
    /// 连接的远程浏览器不会被关闭，只断开连接。
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let result = if self.remote {
            Ok(())
        } else {
            self.browser
                .execute(CloseParams::default())
                .await
                .map(|_| ())
                .map_err(|e| EngineError::FetchError(format!("Failed to close browser: {}", e)))
        };
        self.handler_task.abort();
        info!("Browser shut down");
        result
    }

    async fn load(
        &self,
        page: &Page,
        request: &FetchRequest,
        start: Instant,
    ) -> Result<FetchedPage, EngineError> {
        if !request.user_agent.is_empty() {
            page.set_user_agent(request.user_agent.as_str())
                .await
                .map_err(|e| EngineError::FetchError(format!("Failed to set user agent: {}", e)))?;
        }

        if !request.headers.is_empty() {
            let headers = serde_json::to_value(&request.headers)
                .map_err(|e| EngineError::FetchError(e.to_string()))?;
            page.execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
                .await
                .map_err(|e| EngineError::FetchError(format!("Failed to set headers: {}", e)))?;
        }

        // Subscribe before navigating so no request event is missed
        let activity = NetworkActivity::subscribe(page).await?;

        let status = tokio::time::timeout(request.timeout, navigate(page, &request.url))
            .await
            .map_err(|_| EngineError::NavigationTimeout(request.timeout.as_secs()))??;
        EngineError::check_status(status)?;

        let remaining = request.timeout.saturating_sub(start.elapsed());
        if tokio::time::timeout(remaining, activity.wait_for_idle(self.network_idle))
            .await
            .is_err()
        {
            warn!("Network never went idle before the timeout, capturing content anyway");
        }

        tokio::time::sleep(self.settle_delay).await;

        let content = page
            .content()
            .await
            .map_err(|e| EngineError::FetchError(format!("Failed to capture content: {}", e)))?;

        Ok(FetchedPage {
            url: request.url.clone(),
            status_code: status,
            content,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserEngine {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, EngineError> {
        let start = Instant::now();
        let session = PageSession::open(Arc::clone(&self.browser)).await?;

        let outcome = match session.page() {
            Some(page) => self.load(page, request, start).await,
            None => Err(EngineError::FetchError("Page already released".to_string())),
        };

        session.release().await;
        outcome
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

/// 导航并返回主文档的状态码
async fn navigate(page: &Page, url: &str) -> Result<u16, EngineError> {
    page.goto(url)
        .await
        .map_err(|e| EngineError::NavigationFailed(e.to_string()))?;

    let request = page
        .wait_for_navigation_response()
        .await
        .map_err(|e| EngineError::NavigationFailed(e.to_string()))?
        .ok_or_else(|| EngineError::NavigationFailed("No response received".to_string()))?;

    if let Some(ref failure) = request.failure_text {
        return Err(EngineError::NavigationFailed(failure.clone()));
    }

    let response = request
        .response
        .as_ref()
        .ok_or_else(|| EngineError::NavigationFailed("No response received".to_string()))?;

    Ok(response.status.clamp(0, u16::MAX as i64) as u16)
}

/// 页面会话
///
/// 持有一个独立浏览器上下文及其中的页面。正常路径调用 `release` 显式释放；
/// 若抓取 future 被取消，`Drop` 会在后台完成清理。
struct PageSession {
    browser: Arc<Browser>,
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
}

impl PageSession {
    async fn open(browser: Arc<Browser>) -> Result<Self, EngineError> {
        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| {
                EngineError::FetchError(format!("Failed to create browser context: {}", e))
            })?
            .result
            .browser_context_id;

        let mut session = Self {
            browser,
            page: None,
            context_id: Some(context_id.clone()),
        };

        let mut params = CreateTargetParams::new("about:blank");
        params.browser_context_id = Some(context_id);
        let page = session
            .browser
            .new_page(params)
            .await
            .map_err(|e| EngineError::FetchError(format!("Failed to open page: {}", e)))?;
        session.page = Some(page);

        Ok(session)
    }

    fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    async fn release(mut self) {
        let page = self.page.take();
        let context_id = self.context_id.take();
        dispose(Arc::clone(&self.browser), page, context_id).await;
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        let page = self.page.take();
        let context_id = self.context_id.take();
        if page.is_none() && context_id.is_none() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(dispose(Arc::clone(&self.browser), page, context_id));
            }
            Err(_) => warn!("No runtime available, browser context leaked until shutdown"),
        }
    }
}

async fn dispose(browser: Arc<Browser>, page: Option<Page>, context_id: Option<BrowserContextId>) {
    if let Some(page) = page {
        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }
    }
    if let Some(id) = context_id {
        if let Err(e) = browser.execute(DisposeBrowserContextParams::new(id)).await {
            debug!("Failed to dispose browser context: {}", e);
        }
    }
}

/// 页面网络活动监听
struct NetworkActivity {
    sent: EventStream<EventRequestWillBeSent>,
    finished: EventStream<EventLoadingFinished>,
    failed: EventStream<EventLoadingFailed>,
}

impl NetworkActivity {
    async fn subscribe(page: &Page) -> Result<Self, EngineError> {
        let listen_err = |e: chromiumoxide::error::CdpError| {
            EngineError::FetchError(format!("Failed to listen for network events: {}", e))
        };

        Ok(Self {
            sent: page.event_listener::<EventRequestWillBeSent>().await.map_err(listen_err)?,
            finished: page.event_listener::<EventLoadingFinished>().await.map_err(listen_err)?,
            failed: page.event_listener::<EventLoadingFailed>().await.map_err(listen_err)?,
        })
    }

    async fn wait_for_idle(self, quiet: Duration) {
        wait_for_network_idle(
            self.sent.map(|e| e.request_id.inner().clone()),
            self.finished.map(|e| e.request_id.inner().clone()),
            self.failed.map(|e| e.request_id.inner().clone()),
            quiet,
        )
        .await
    }
}

/// 在途请求集合
///
/// 三类事件来自不同的流，消费顺序不保证与发生顺序一致。
/// 已结束的请求ID会被记住，迟到的发送事件不再计入在途。
#[derive(Debug, Default)]
struct InFlightRequests {
    pending: HashSet<String>,
    completed: HashSet<String>,
}

impl InFlightRequests {
    fn sent(&mut self, id: String) {
        if !self.completed.contains(&id) {
            self.pending.insert(id);
        }
    }

    fn done(&mut self, id: String) {
        self.pending.remove(&id);
        self.completed.insert(id);
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

/// 等待直到 `quiet` 时长内没有在途请求，任何网络事件都会重新开始计时
async fn wait_for_network_idle<S, F, E>(sent: S, finished: F, failed: E, quiet: Duration)
where
    S: Stream<Item = String> + Unpin,
    F: Stream<Item = String> + Unpin,
    E: Stream<Item = String> + Unpin,
{
    let mut sent = sent.fuse();
    let mut finished = finished.fuse();
    let mut failed = failed.fuse();
    let mut requests = InFlightRequests::default();

    loop {
        let idle = requests.is_idle();
        tokio::select! {
            Some(id) = sent.next() => requests.sent(id),
            Some(id) = finished.next() => requests.done(id),
            Some(id) = failed.next() => requests.done(id),
            _ = tokio::time::sleep(quiet), if idle => return,
            else => return,
        }
    }
}

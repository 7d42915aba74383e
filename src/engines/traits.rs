// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// 未收到响应（DNS失败、连接被拒绝）
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),
    /// 超时时间内未收到主文档响应
    #[error("Navigation failed: timed out after {0}s waiting for a response")]
    NavigationTimeout(u64),
    /// 收到响应但状态码 >= 400
    #[error("HTTP error: status {0}")]
    HttpError(u16),
    /// 页面加载或内容捕获过程中的其他错误
    #[error("Fetch error: {0}")]
    FetchError(String),
}

impl EngineError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::NavigationFailed(_) => true,
            // a full timeout already spent the whole budget
            EngineError::NavigationTimeout(_) => false,
            EngineError::HttpError(status) => *status == 429 || *status >= 500,
            EngineError::FetchError(_) => false,
        }
    }

    /// 根据状态码分类导航结果
    ///
    /// 状态码 >= 400 时返回 `HttpError`
    pub fn check_status(status: u16) -> Result<u16, EngineError> {
        if status >= 400 {
            Err(EngineError::HttpError(status))
        } else {
            Ok(status)
        }
    }
}

/// 抓取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: String,
    /// User-Agent
    pub user_agent: String,
    /// 额外请求头
    pub headers: HashMap<String, String>,
    /// 导航超时时间
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            user_agent: user_agent.into(),
            headers: HashMap::new(),
            timeout,
        }
    }
}

/// 抓取到的页面
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// 请求的URL
    pub url: String,
    /// 主文档的HTTP状态码
    pub status_code: u16,
    /// 渲染完成后的HTML
    pub content: String,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

/// 页面抓取器特质
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 加载页面并返回渲染后的HTML
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}

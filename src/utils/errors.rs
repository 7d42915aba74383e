// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 提取层错误类型
///
/// 提取错误不会导致页面失败，编排器会把它吸收为空的单元列表。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// 生成端点不可达或返回非成功状态
    #[error("生成端点请求失败: {0}")]
    Transport(String),

    /// 生成端点超时
    #[error("生成端点请求超时（{0}秒）")]
    Timeout(u64),

    /// 模型输出不是可恢复的JSON
    #[error("模型输出解析失败: {0}")]
    Parse(String),

    /// 模型输出形状不符合预期
    #[error("模型输出形状不符: {0}")]
    UnexpectedShape(String),
}

impl ExtractionError {
    /// 是否属于传输层错误（端点不可达、非200或超时）
    pub fn is_transport(&self) -> bool {
        matches!(self, ExtractionError::Transport(_) | ExtractionError::Timeout(_))
    }

    /// 是否属于解析层错误
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            ExtractionError::Parse(_) | ExtractionError::UnexpectedShape(_)
        )
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        ExtractionError::Transport(e.to_string())
    }
}

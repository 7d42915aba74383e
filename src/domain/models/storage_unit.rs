// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 仓储单元实体
///
/// 页面上观察到的一个可租用的自助仓储单元。
/// `size` 与 `price` 始终非空，缺失任一字段的候选项在提取阶段即被丢弃。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// 来源页面URL
    #[serde(rename = "url")]
    pub source_url: String,
    /// 规范化尺寸，例如 "5x5"
    pub size: String,
    /// 规范化价格（含计价周期），例如 "$100/month"
    pub price: String,
    /// 原始尺寸文本，用于审计
    pub raw_size: Option<String>,
    /// 原始价格文本，用于审计
    pub raw_price: Option<String>,
}

impl Unit {
    /// 创建新的仓储单元
    ///
    /// 当 `size` 或 `price` 去除空白后为空时返回 `None`。
    /// 未提供原始文本时，原始字段回退为规范化值。
    ///
    /// # 参数
    ///
    /// * `source_url` - 来源页面URL
    /// * `size` - 规范化尺寸
    /// * `price` - 规范化价格
    /// * `raw_size` - 可选的原始尺寸文本
    /// * `raw_price` - 可选的原始价格文本
    pub fn new(
        source_url: impl Into<String>,
        size: impl Into<String>,
        price: impl Into<String>,
        raw_size: Option<String>,
        raw_price: Option<String>,
    ) -> Option<Self> {
        let size = size.into().trim().to_string();
        let price = price.into().trim().to_string();
        if size.is_empty() || price.is_empty() {
            return None;
        }

        Some(Self {
            source_url: source_url.into(),
            raw_size: Some(raw_size.unwrap_or_else(|| size.clone())),
            raw_price: Some(raw_price.unwrap_or_else(|| price.clone())),
            size,
            price,
        })
    }
}

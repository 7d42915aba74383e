// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::storage_unit::Unit;
use serde::{Deserialize, Serialize};

/// 单个URL的处理结果
///
/// 每个输入URL对应一个结果，由编排器创建，返回后不再修改。
/// `error` 当且仅当 `success` 为 false 时存在；失败时 `units` 为空。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 输入URL
    pub url: String,
    /// 是否成功
    pub success: bool,
    /// 提取到的仓储单元，按模型输出顺序排列
    pub units: Vec<Unit>,
    /// 失败原因
    pub error: Option<String>,
    /// 页面加载成功但提取失败时的诊断信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
}

impl PageResult {
    /// 创建成功结果
    ///
    /// 单元列表可以为空，"未找到单元"是合法的成功结果。
    pub fn success(url: impl Into<String>, units: Vec<Unit>) -> Self {
        Self {
            url: url.into(),
            success: true,
            units,
            error: None,
            extraction_error: None,
        }
    }

    /// 创建页面加载成功但提取失败的结果
    pub fn extraction_failed(url: impl Into<String>, cause: impl ToString) -> Self {
        Self {
            extraction_error: Some(cause.to_string()),
            ..Self::success(url, Vec::new())
        }
    }

    /// 创建失败结果
    pub fn failure(url: impl Into<String>, error: impl ToString) -> Self {
        let mut error = error.to_string();
        if error.is_empty() {
            error = "unknown error".to_string();
        }
        Self {
            url: url.into(),
            success: false,
            units: Vec::new(),
            error: Some(error),
            extraction_error: None,
        }
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}

/// 一次运行的汇总统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_units: usize,
}

impl RunSummary {
    pub fn from_results(results: &[PageResult]) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            total_units: results
                .iter()
                .filter(|r| r.success)
                .map(PageResult::unit_count)
                .sum(),
        }
    }
}

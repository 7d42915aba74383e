// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 负责与外部系统的交互：
/// - 导出（export）：把页面结果写入 CSV 或 JSON 文件
pub mod export;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置文件和环境变量
pub mod config;

/// 领域模块
///
/// 包含仓储单元实体、页面结果以及模型提取服务
pub mod domain;

/// 引擎模块
///
/// 基于无头浏览器的页面抓取引擎
pub mod engines;

/// 基础设施模块
///
/// 结果导出
pub mod infrastructure;

/// 工具模块
///
/// 错误类型、重试策略和日志初始化
pub mod utils;

/// 工作器模块
///
/// 单个URL的抓取流程与有界并发的编排
pub mod workers;

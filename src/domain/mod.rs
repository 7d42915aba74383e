// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：仓储单元与页面结果
/// - 服务（services）：HTML预处理、提示词构建、LLM调用与响应解析
///
/// 领域层不依赖浏览器或编排实现。
pub mod models;
pub mod services;

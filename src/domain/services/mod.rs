// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 提取服务（extraction_service）：把渲染后的HTML转换为仓储单元列表
/// - LLM服务（llm_service）：调用生成式文本端点
pub mod extraction_service;
pub mod llm_service;

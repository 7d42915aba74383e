// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心数据实体：
/// - 仓储单元（storage_unit）：页面上的一个可租用单元及其尺寸、价格
/// - 页面结果（page_result）：单个URL的处理结果及运行汇总
pub mod page_result;
pub mod storage_unit;

pub use page_result::{PageResult, RunSummary};
pub use storage_unit::Unit;

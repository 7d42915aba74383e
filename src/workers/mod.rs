// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供单URL抓取流程和并发调度功能
/// 包括抓取工作器（scrape_worker）和有界并发的抓取管理器（manager）
pub mod manager;
pub mod scrape_worker;

pub use manager::ScrapeManager;
pub use scrape_worker::{ScrapeWorker, WorkerConfig};

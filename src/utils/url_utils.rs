// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use url::Url;

/// 是否为可抓取的 http(s) URL
pub fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

/// 去重并保持首次出现的顺序
///
/// # 返回值
///
/// 去重后的URL列表以及被移除的重复项数量
pub fn dedup_urls<I>(urls: I) -> (Vec<String>, usize)
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut removed = 0;

    for url in urls {
        if seen.insert(url.clone()) {
            unique.push(url);
        } else {
            removed += 1;
        }
    }

    (unique, removed)
}

/// 读取每行一个URL的文件，忽略空行
///
/// 文件中没有任何URL时返回 `InvalidData` 错误
pub fn read_url_file(path: &Path) -> io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no URLs found in {}", path.display()),
        ));
    }
    Ok(urls)
}

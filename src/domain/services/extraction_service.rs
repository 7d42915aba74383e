// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::Unit;
use crate::domain::services::llm_service::LLMServiceTrait;
use crate::utils::errors::ExtractionError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 提示词中HTML摘录的默认字符上限
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 8000;

/// 截断标记
pub const TRUNCATION_MARKER: &str = "...";

/// 不参与文本提取的元素
const SKIPPED_ELEMENTS: [&str; 6] = ["script", "style", "meta", "link", "noscript", "template"];

// First '[' to last ']' across newlines
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// 把HTML压缩成适合放入提示词的纯文本
///
/// 去掉脚本、样式等非内容元素，文本节点以单个空格连接，
/// 超过 `max_chars` 个字符时硬截断并追加 `...`。
pub fn preprocess_html(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let mut words: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
        });
        if !skipped {
            words.extend(text.split_whitespace());
        }
    }

    truncate_chars(&words.join(" "), max_chars)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// 构建提取提示词，HTML摘录原样附在末尾
pub fn build_prompt(url: &str, excerpt: &str) -> String {
    format!(
        r#"You extract self-storage unit listings from web page text.

Task: find every storage unit size and its price in the page content below.

Sizes can appear as "5x5", "10x20", "5' x 5'", "10 ft x 15 ft", "50 sq ft" or "25 square feet".
Prices can appear as "$100", "$99/month", "€75", "£50 per month" or "$12.50 weekly".

Respond with ONLY a JSON array and nothing else, no prose and no markdown:
[
  {{"size": "5x5", "price": "$100/month"}},
  {{"size": "10x10", "price": "$150/month"}}
]

Rules:
- Write every size in the compact "AxB" form, e.g. "5x5" instead of "5' x 5'".
- Keep the pricing period when the page states one, e.g. "/month" or "/week".
- List each unit once; drop repeated entries.
- If the page lists no units, respond with [].

Page content from {url}:
{excerpt}
"#
    )
}

/// 模型输出数组中的一个元素
#[derive(Debug, Clone, PartialEq)]
enum Candidate {
    Unit {
        size: String,
        price: String,
        raw_size: Option<String>,
        raw_price: Option<String>,
    },
    Skip(&'static str),
}

impl Candidate {
    fn classify(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Candidate::Skip("element is not an object");
        };
        let (Some(size), Some(price)) = (map.get("size"), map.get("price")) else {
            return Candidate::Skip("missing size or price");
        };

        let size = coerce(size);
        let price = coerce(price);
        if size.is_empty() || price.is_empty() {
            return Candidate::Skip("empty size or price");
        }

        let raw = |key: &str| map.get(key).filter(|v| !v.is_null()).map(coerce);
        Candidate::Unit {
            raw_size: raw("raw_size"),
            raw_price: raw("raw_price"),
            size,
            price,
        }
    }
}

fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 把模型的自由文本输出解析为仓储单元
///
/// # 错误
/// * 找不到可解析的JSON时返回 `ExtractionError::Parse`
/// * 顶层不是数组时返回 `ExtractionError::UnexpectedShape`
pub fn parse_model_response(raw: &str, url: &str) -> Result<Vec<Unit>, ExtractionError> {
    let payload = BRACKETED
        .find(raw)
        .map(|m| m.as_str())
        .unwrap_or_else(|| raw.trim());

    let value: Value =
        serde_json::from_str(payload).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let Value::Array(items) = value else {
        return Err(ExtractionError::UnexpectedShape(format!(
            "expected a JSON array, got {}",
            json_type(&value)
        )));
    };

    let mut units = Vec::with_capacity(items.len());
    for item in &items {
        match Candidate::classify(item) {
            Candidate::Unit {
                size,
                price,
                raw_size,
                raw_price,
            } => {
                if let Some(unit) = Unit::new(url, size, price, raw_size, raw_price) {
                    units.push(unit);
                }
            }
            Candidate::Skip(reason) => warn!(%reason, "Invalid unit data: {}", item),
        }
    }

    Ok(units)
}

/// 提取服务
///
/// 负责把渲染后的HTML交给LLM并解析出仓储单元
pub struct ExtractionService {
    llm: Arc<dyn LLMServiceTrait>,
    max_prompt_chars: usize,
}

impl ExtractionService {
    pub fn new(llm: Arc<dyn LLMServiceTrait>) -> Self {
        Self {
            llm,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }

    pub fn with_max_prompt_chars(mut self, max_prompt_chars: usize) -> Self {
        self.max_prompt_chars = max_prompt_chars;
        self
    }

    /// 提取数据
    #[instrument(skip(self, html), fields(url = %url))]
    pub async fn extract(&self, html: &str, url: &str) -> Result<Vec<Unit>, ExtractionError> {
        let excerpt = preprocess_html(html, self.max_prompt_chars);
        let prompt = build_prompt(url, &excerpt);
        debug!(chars = excerpt.chars().count(), "Built extraction prompt");

        let response = self.llm.generate(&prompt).await?;

        let units = parse_model_response(&response, url).inspect_err(|e| {
            warn!("Failed to parse model response: {}", e);
            debug!("Raw response: {}", response);
        })?;

        info!("Extracted {} units from {}", units.len(), url);
        Ok(units)
    }
}

//! Keyword product matching over the price list
//!
//! Scores every catalog row against the user's question and formats the best
//! matches, with their CSV prices, as a context block for the model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::types::json::{display_value, is_truthy};

/// Price column spellings seen in the CSV exports, in lookup order
pub const PRICE_COLUMNS: [&str; 7] = [
    "Fiyat TL (KDV dahil)",
    "Fiyat TL (KDV Dahil)",
    "Fiyat TL",
    "Fiyat (TL)",
    "Fiyat",
    "Fiyat (KDV Dahil)",
    "Fiyat (KDV dahil)",
];

/// Columns that make up a product's searchable text
const SEARCH_COLUMNS: [&str; 7] = [
    "SKU",
    "Ürün Adı",
    "Model",
    "Kategori",
    "İşlev Grubu",
    "Kullanım Yeri",
    "Uygun Olduğu Sistemler",
];

pub const PRODUCT_CONTEXT_HEADER: &str = "İLGİLİ ÜRÜNLER VE FİYATLAR (CSV'den):";

pub const MISSING_PRICE_TEXT: &str =
    "FİYAT BİLGİSİ CSV'DE YOK (bu ürün için fiyat UYDURMA, müşteriye fiyat veremediğini söyle)";

static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)").expect("valid regex"));

/// Price cell of a product as text, or `""` when no usable price is present
///
/// The first column that exists and is not null wins, even when it is empty.
pub fn price_text(product: &Value) -> String {
    let raw = PRICE_COLUMNS
        .iter()
        .filter_map(|col| product.get(*col))
        .find(|v| !v.is_null());

    match raw {
        Some(v) if is_truthy(v) => display_value(v),
        _ => String::new(),
    }
}

/// Rank catalog rows against `query`, best first
pub fn find_related_products<'a>(
    catalog: &'a [Value],
    query: &str,
    limit: usize,
) -> Vec<&'a Value> {
    if query.is_empty() || catalog.is_empty() {
        return Vec::new();
    }

    // "tm24" -> "tm 2  4 " so model numbers match digit by digit
    let q = DIGIT.replace_all(&query.to_lowercase(), " $1 ").into_owned();
    let words: Vec<&str> = q.split_whitespace().collect();

    let mut scored: Vec<(u32, &Value)> = catalog
        .iter()
        .map(|product| (score(&q, &words, &search_text(product)), product))
        .filter(|(score, _)| *score > 0)
        .collect();

    // stable: equal scores keep catalog order
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, p)| p).collect()
}

fn score(q: &str, words: &[&str], text: &str) -> u32 {
    let mut score = 0;

    if text.contains(q) {
        score += 5;
    }

    for w in words {
        if text.contains(w) {
            score += 2;
        }
    }

    if q.contains("tm2") && text.contains("tm2") {
        score += 10;
    }
    if q.contains('4') && text.contains("4 ist") && text.contains("tm2") {
        score += 10;
    }

    score
}

fn search_text(product: &Value) -> String {
    SEARCH_COLUMNS
        .iter()
        .filter_map(|col| product.get(*col))
        .filter(|v| is_truthy(v))
        .map(display_value)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Format matched products as the price context block
pub fn product_context(products: &[&Value]) -> String {
    if products.is_empty() {
        return String::new();
    }

    let lines: Vec<String> = products
        .iter()
        .map(|p| {
            let price = price_text(p);
            let price = price.trim();
            let price_line = if matches!(price, "" | "0" | "0,00" | "0.00") {
                MISSING_PRICE_TEXT.to_string()
            } else {
                format!("{price} TL (CSV)")
            };
            format!(
                "- SKU: {} | Ürün: {} | Fiyat: {}",
                field(p, "SKU"),
                field(p, "Ürün Adı"),
                price_line
            )
        })
        .collect();

    format!("{PRODUCT_CONTEXT_HEADER}\n{}", lines.join("\n"))
}

fn field(product: &Value, key: &str) -> String {
    product.get(key).map(display_value).unwrap_or_default()
}

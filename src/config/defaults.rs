//! Built-in platform, keyword and category tables
//!
//! These are the values the harvester runs with when no configuration file
//! overrides them.

use crate::config::types::{CategoryEntry, PlatformConfig};
use std::collections::BTreeMap;

pub const DEFAULT_CATEGORY: &str = "其他AI产品";

pub const PRIMARY_KEYWORDS: &[&str] = &[
    "AI陪伴",
    "智能陪伴",
    "虚拟女友",
    "虚拟男友",
    "宠物机器人",
    "陪伴机器人",
    "智能音箱",
];

pub const SECONDARY_KEYWORDS: &[&str] = &[
    "二次元",
    "动漫手办",
    "语音助手",
    "AI玩偶",
    "智能玩具",
    "语音陪伴",
    "AI女友",
    "AI伴侣",
];

pub const BRAND_KEYWORDS: &[&str] = &[
    "小爱同学",
    "天猫精灵",
    "小度",
    "若琪",
    "Alexa",
    "小米音箱",
    "华为音箱",
];

/// Review and experience terms favored on the note-sharing platform
pub const REVIEW_KEYWORDS: &[&str] = &["AI音箱评测", "AI陪伴机器人", "智能助手使用感受", "二次元AI"];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

pub fn user_agents() -> Vec<String> {
    to_strings(USER_AGENTS)
}

pub fn page_delay_ms() -> u64 {
    2000
}

pub fn keyword_delay_ms() -> u64 {
    3000
}

pub fn page_size() -> u32 {
    20
}

pub fn enabled() -> bool {
    true
}

/// The ordered category table; the first matching row wins
pub fn categories() -> Vec<CategoryEntry> {
    let rows: &[(&str, &[&str])] = &[
        ("AI音箱", &["智能音箱", "语音助手", "小爱同学", "天猫精灵", "小度"]),
        ("陪伴机器人", &["宠物机器人", "陪伴机器人", "AI狗", "AI猫", "智能宠物"]),
        ("虚拟伴侣", &["虚拟女友", "虚拟男友", "AI女友", "AI伴侣"]),
        ("二次元手办", &["智能手办", "会说话的手办", "语音手办", "动漫机器人"]),
        ("AI玩具", &["智能玩具", "AI玩偶", "会聊天的玩具"]),
    ];

    rows.iter()
        .map(|(name, keywords)| CategoryEntry {
            name: name.to_string(),
            keywords: to_strings(keywords),
        })
        .collect()
}

pub fn platforms() -> Vec<PlatformConfig> {
    vec![taobao(), xiaohongshu(), douyin()]
}

/// Marketplace listing pages: every configured term, short page pause
pub fn taobao() -> PlatformConfig {
    let keywords = PRIMARY_KEYWORDS
        .iter()
        .chain(SECONDARY_KEYWORDS)
        .chain(BRAND_KEYWORDS);

    PlatformConfig {
        id: "taobao".to_string(),
        name: "淘宝".to_string(),
        base_url: "https://s.taobao.com".to_string(),
        search_path: "/search".to_string(),
        page_delay_ms: 2000,
        keyword_delay_ms: 3000,
        page_size: 44,
        keywords: keywords.map(|k| k.to_string()).collect(),
        headers: headers(&[
            ("Referer", "https://www.taobao.com/"),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
            ("Cache-Control", "max-age=0"),
            ("Upgrade-Insecure-Requests", "1"),
        ]),
        enabled: true,
    }
}

/// Note-sharing platform: fewer primary terms plus review terms, stricter pacing
pub fn xiaohongshu() -> PlatformConfig {
    let keywords = PRIMARY_KEYWORDS[..5].iter().chain(REVIEW_KEYWORDS);

    PlatformConfig {
        id: "xiaohongshu".to_string(),
        name: "小红书".to_string(),
        base_url: "https://www.xiaohongshu.com".to_string(),
        search_path: "/search_result".to_string(),
        page_delay_ms: 3000,
        keyword_delay_ms: 5000,
        page_size: 20,
        keywords: keywords.map(|k| k.to_string()).collect(),
        headers: headers(&[
            ("Referer", "https://www.xiaohongshu.com/"),
            ("Accept", "application/json, text/plain, */*"),
            ("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8"),
            ("Cache-Control", "no-cache"),
            ("Pragma", "no-cache"),
            ("X-Requested-With", "XMLHttpRequest"),
        ]),
        enabled: true,
    }
}

/// Declared but without a crawler variant yet
pub fn douyin() -> PlatformConfig {
    PlatformConfig {
        id: "douyin".to_string(),
        name: "抖音".to_string(),
        base_url: "https://www.douyin.com".to_string(),
        search_path: "/search".to_string(),
        page_delay_ms: page_delay_ms(),
        keyword_delay_ms: keyword_delay_ms(),
        page_size: page_size(),
        keywords: to_strings(PRIMARY_KEYWORDS),
        headers: BTreeMap::new(),
        enabled: true,
    }
}

fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

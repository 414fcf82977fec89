//! 发布文件分类
//!
//! 有序规则链，第一条命中的规则决定分类，全部未命中归入 `vault`。

use std::collections::HashSet;

/// 未命中任何规则时的分类
pub const DEFAULT_CATEGORY: &str = "vault";

/// 文件名匹配条件
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Prefix(String),
    Contains(String),
    /// 前缀 + 后缀同时满足
    PrefixSuffix(String, String),
    /// 包含 + 后缀同时满足
    ContainsSuffix(String, String),
    /// 属于固定文件名集合
    OneOf(HashSet<String>),
    /// 任一子条件满足
    Any(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, filename: &str) -> bool {
        match self {
            Matcher::Exact(name) => filename == name,
            Matcher::Prefix(prefix) => filename.starts_with(prefix.as_str()),
            Matcher::Contains(part) => filename.contains(part.as_str()),
            Matcher::PrefixSuffix(prefix, suffix) => {
                filename.starts_with(prefix.as_str()) && filename.ends_with(suffix.as_str())
            }
            Matcher::ContainsSuffix(part, suffix) => {
                filename.contains(part.as_str()) && filename.ends_with(suffix.as_str())
            }
            Matcher::OneOf(names) => names.contains(filename),
            Matcher::Any(matchers) => matchers.iter().any(|m| m.matches(filename)),
        }
    }
}

/// 分类规则
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub matcher: Matcher,
    pub category: String,
}

impl CategoryRule {
    pub fn new(matcher: Matcher, category: &str) -> Self {
        Self {
            matcher,
            category: category.to_string(),
        }
    }
}

/// 分类器
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<CategoryRule>,
    default_category: String,
}

fn s(v: &str) -> String {
    v.to_string()
}

impl Classifier {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self {
            rules,
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }

    /// 标准规则链，`dashboard_filenames` 为归入 dashboard 的图表文件名
    pub fn standard<I, S>(dashboard_filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let charts: HashSet<String> = dashboard_filenames.into_iter().map(Into::into).collect();

        // 顺序即优先级
        Self::new(vec![
            CategoryRule::new(Matcher::PrefixSuffix(s("gong_"), s(".jpg")), "gong"),
            CategoryRule::new(Matcher::Exact(s("ccor1_anim.mp4")), "goes"),
            CategoryRule::new(Matcher::Exact(s("enlil_anim.mp4")), "seaesrt"),
            CategoryRule::new(Matcher::Exact(s("gong_anim.mp4")), "gong"),
            CategoryRule::new(Matcher::Exact(s("drap_global_anim.mp4")), "ionosphere"),
            CategoryRule::new(Matcher::Prefix(s("flare_anim")), "flares_visual"),
            CategoryRule::new(Matcher::Prefix(s("stereo")), "stereo"),
            CategoryRule::new(Matcher::Prefix(s("drap_")), "ionosphere"),
            CategoryRule::new(
                Matcher::Any(vec![
                    Matcher::Prefix(s("ace-")),
                    Matcher::Contains(s("proton")),
                    Matcher::Contains(s("electrons")),
                    Matcher::Contains(s("xray")),
                ]),
                "ace",
            ),
            CategoryRule::new(
                Matcher::Any(vec![Matcher::Prefix(s("seaesrt")), Matcher::Prefix(s("geospace"))]),
                "seaesrt",
            ),
            CategoryRule::new(Matcher::ContainsSuffix(s("lasco"), s("anim.gif")), "lasco"),
            CategoryRule::new(Matcher::OneOf(charts), "dashboard"),
        ])
    }

    /// 第一条命中的规则决定分类
    pub fn classify(&self, filename: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(filename))
            .map(|rule| rule.category.as_str())
            .unwrap_or(self.default_category.as_str())
    }
}

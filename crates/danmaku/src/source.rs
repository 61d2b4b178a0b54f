//! Comment sources.
//!
//! A source turns an identifier (a URL, a file path, a room id) into a list of
//! comments. The playback screens have no comment-fetch integration yet, so
//! [`DemoSource`] serves fixed lists. [`XmlFileSource`] reads danmu XML files
//! such as the ones the recorder writes.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::comment::Comment;
use crate::error::{DanmakuError, Result};

/// Comments shown on on-demand video screens.
pub const VIDEO_COMMENTS: &[&str] = &[
    "前面的区域以后再来探索吧",
    "23333333",
    "好耶！",
    "这个太棒了",
    "666666",
    "UP主太强了",
    "这也太帅了吧",
    "期待下一期",
    "画质真不错",
    "收藏了",
    "已投币",
    "三连支持",
    "这技术可以啊",
    "学到了",
    "这就是专业",
    "太强了",
    "大佬大佬",
    "爱了爱了",
    "绝了",
    "yyds",
    "前方高能",
    "火钳刘明",
    "弹幕护体",
    "前方高能预警",
    "见证历史",
    "高能预警",
];

/// Comments cycled on live screens.
pub const LIVE_COMMENTS: &[&str] = &[
    "666666",
    "主播牛逼！",
    "这个操作太强了",
    "前排围观",
    "这波怎么说？",
    "学到了",
    "6666666",
    "太强了",
    "专业啊",
    "哈哈哈",
    "yyds",
    "爱了爱了",
    "这技术",
    "绝了",
    "好耶",
    "真香",
    "这操作",
    "大佬",
    "支持支持",
    "好看好看",
];

/// Something that can produce comments for a source identifier.
pub trait CommentSource {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Load all comments for `source_id`.
    fn load(&self, source_id: &str) -> Result<Vec<Comment>>;
}

/// Fixed comment list, independent of the identifier.
#[derive(Debug, Clone)]
pub struct DemoSource {
    name: &'static str,
    items: &'static [&'static str],
}

impl DemoSource {
    /// The on-demand video list.
    pub fn video() -> Self {
        Self {
            name: "demo-video",
            items: VIDEO_COMMENTS,
        }
    }

    /// The live list.
    pub fn live() -> Self {
        Self {
            name: "demo-live",
            items: LIVE_COMMENTS,
        }
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.items.iter().map(|s| Comment::from(*s)).collect()
    }
}

impl CommentSource for DemoSource {
    fn name(&self) -> &str {
        self.name
    }

    fn load(&self, source_id: &str) -> Result<Vec<Comment>> {
        debug!(source = self.name, source_id, "Serving demo comments");
        Ok(self.comments())
    }
}

/// Reads comments from danmu XML files.
///
/// The identifier is a file path, resolved against `root` when relative.
#[derive(Debug, Clone, Default)]
pub struct XmlFileSource {
    root: Option<PathBuf>,
}

impl XmlFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative identifiers against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, source_id: &str) -> PathBuf {
        let path = Path::new(source_id);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl CommentSource for XmlFileSource {
    fn name(&self) -> &str {
        "xml"
    }

    fn load(&self, source_id: &str) -> Result<Vec<Comment>> {
        if source_id.is_empty() {
            return Err(DanmakuError::source_error("empty XML source path"));
        }
        let path = self.resolve(source_id);
        let xml = std::fs::read_to_string(&path)?;
        let comments = parse_danmu_xml(&xml)?;
        debug!(path = %path.display(), count = comments.len(), "Loaded XML comments");
        Ok(comments)
    }
}

#[derive(Debug, Deserialize)]
struct DanmuDocument {
    #[serde(rename = "d", default)]
    entries: Vec<DanmuEntry>,
}

#[derive(Debug, Deserialize)]
struct DanmuEntry {
    #[serde(rename = "@p", default)]
    p: Option<String>,
    #[serde(rename = "$text", default)]
    text: String,
}

impl DanmuEntry {
    /// First `p` field: appearance offset or timestamp, depending on the writer.
    fn offset(&self) -> Option<f64> {
        self.p
            .as_deref()?
            .split(',')
            .next()?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

/// Parse `<d p="...">text</d>` entries from a danmu XML document.
///
/// Entries with empty text are skipped. When every entry carries a numeric
/// first `p` field the result is ordered by it, otherwise document order is
/// kept.
pub fn parse_danmu_xml(xml: &str) -> Result<Vec<Comment>> {
    let document: DanmuDocument = quick_xml::de::from_str(xml)?;

    let mut entries: Vec<(Option<f64>, String)> = document
        .entries
        .into_iter()
        .filter(|e| !e.text.is_empty())
        .map(|e| (e.offset(), e.text))
        .collect();

    if entries.iter().all(|(offset, _)| offset.is_some()) {
        entries.sort_by(|a, b| a.0.unwrap_or(0.0).total_cmp(&b.0.unwrap_or(0.0)));
    }

    Ok(entries
        .into_iter()
        .map(|(_, text)| Comment::from(text))
        .collect())
}

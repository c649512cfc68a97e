//! Turn a batch of tweets into one curated digest.
//!
//! The whole batch goes into a single prompt grouped by author. Responses cut
//! at `max_tokens` are continued up to [`MAX_CONTINUATIONS`] times.
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, FixedOffset, Utc};
use digest_common::{DigestError, Result, Tweet};
use regex::Regex;
use tracing::{info, warn};

use crate::traits::{GenerateRequest, LlmClient, Message, StopReason};

pub const MAX_CONTINUATIONS: usize = 2;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
/// Tail of the cut-off text quoted back when asking for a continuation.
const CONTEXT_TAIL_CHARS: usize = 100;
/// Prefix length used to spot a continuation that restarts from the top.
const REPEAT_CHECK_CHARS: usize = 200;

/// Tweet times are shown in Beijing time (UTC+8).
const DISPLAY_OFFSET_SECS: i32 = 8 * 3600;

pub const SYSTEM_PROMPT: &str = "你是专业的信息策展人。从推文中提炼有价值的信息，按话题归类，突出重点。只提取具体事实，拒绝空洞概括。";

const INSTRUCTIONS: &str = r#"# 输出要求

## 📰 X 简报 - {日期}

### 🔥 今日重点
最重要的 5-8 条信息，每条包含：
- **[标题]** (@来源)
  - 核心内容（一两句话说清楚）
  - 原文链接

### 按话题归类

对剩余内容按话题归类，话题名称根据实际内容动态生成（如：科技、商业、AI、政治、文化、生活、观点争鸣等），每个话题下列出要点：
- **[要点]** (@来源) - 一句话概括 [链接]

### 💬 有趣的声音
值得一读的个人观点、吐槽、预测（保留原文精华）

---
**规则：**
1. 只输出有**具体信息**的内容，拒绝空洞概括
2. 数字、名称、链接必须来自原文，禁止编造
3. 无内容的分类直接省略
4. 中文输出，专有名词保留英文
5. **同一账号的多条相似推文合并为一条，避免逐条罗列**
6. 纯转发、广告、无实质内容的推文直接忽略
7. 标记为 [🧵Thread] 的内容是同一作者的连续自回复，应作为整体理解和总结，不要拆开
"#;

pub struct Summarizer {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
    temperature: f32,
}

impl Summarizer {
    pub fn new(client: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self {
            client,
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Build the user prompt. An empty batch still yields a complete prompt.
    pub fn create_prompt(tweets: &[Tweet]) -> String {
        let mut body = String::new();
        if tweets.is_empty() {
            body.push_str("\n（本次没有抓取到任何推文。请直接说明今日无可汇总的内容。）\n");
        }
        for (author, group) in group_by_author(tweets) {
            let _ = write!(body, "\n\n=== @{author} ===\n");
            for (i, t) in group.iter().enumerate() {
                let tag = if t.is_thread { "[🧵Thread] " } else { "" };
                let at = t.created_at.map(display_time).unwrap_or_default();
                let _ = writeln!(body, "{}. {tag}[{at}] {}", i + 1, t.text);
                let _ = writeln!(
                    body,
                    "   (❤️ {} | 🔄 {} | 🔗 {})",
                    t.likes, t.retweets, t.url
                );
            }
        }

        format!(
            "# 角色\n你是一位专业的信息策展人，擅长从 Twitter/X 动态中提炼**有价值的信息**，按话题归类并突出重要内容。\n\n# 原始推文\n{body}\n\n{INSTRUCTIONS}"
        )
    }

    /// Ask the model for the digest, continuing truncated output.
    pub async fn summarize(&self, tweets: &[Tweet]) -> Result<String> {
        info!(tweets = tweets.len(), model = self.model_name(), "summarizing");
        let mut req = GenerateRequest {
            system: Some(SYSTEM_PROMPT.to_string()),
            messages: vec![Message::user(Self::create_prompt(tweets))],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut digest = String::new();
        for round in 0..=MAX_CONTINUATIONS {
            let resp = self.client.generate(&req).await?;
            let content = strip_think(&resp.text);

            if !digest.is_empty() && content.chars().count() > REPEAT_CHECK_CHARS {
                let head: String = content.chars().take(REPEAT_CHECK_CHARS).collect();
                if digest.contains(&head) {
                    warn!("continuation repeats earlier output; stopping");
                    break;
                }
            }
            digest.push_str(&content);

            if resp.stop != StopReason::MaxTokens || round == MAX_CONTINUATIONS {
                break;
            }
            info!(round = round + 1, max = MAX_CONTINUATIONS, "response truncated; continuing");
            let tail = tail_chars(&content, CONTEXT_TAIL_CHARS);
            req.messages.push(Message::assistant(content));
            req.messages.push(Message::user(format!(
                "你的回复被截断了，请从「{tail}」之后继续输出，不要重复已输出的内容。"
            )));
        }

        if digest.trim().is_empty() {
            return Err(DigestError::Llm("model returned an empty digest".into()));
        }
        info!(chars = digest.chars().count(), "digest generated");
        Ok(digest)
    }
}

/// Authors in first-seen order, each with their tweets in input order.
fn group_by_author(tweets: &[Tweet]) -> Vec<(&str, Vec<&Tweet>)> {
    let mut groups: Vec<(&str, Vec<&Tweet>)> = Vec::new();
    for t in tweets {
        match groups.iter_mut().find(|(a, _)| *a == t.author) {
            Some((_, g)) => g.push(t),
            None => groups.push((t.author.as_str(), vec![t])),
        }
    }
    groups
}

fn display_time(at: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(DISPLAY_OFFSET_SECS) {
        Some(tz) => at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string(),
        None => at.format("%Y-%m-%d %H:%M").to_string(),
    }
}

/// Drop `<think>…</think>` reasoning blocks and surrounding whitespace.
pub fn strip_think(text: &str) -> String {
    static THINK: OnceLock<Option<Regex>> = OnceLock::new();
    match THINK.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").ok()) {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

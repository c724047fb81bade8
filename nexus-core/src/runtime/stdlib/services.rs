//! 外部协作服务
//!
//! 知识库与语音服务由宿主注入。运行期间只借用，不持有。

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 服务调用失败
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ServiceError(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeQueryResult {
    pub title: String,
    pub summary: String,
    /// [0, 1]
    pub confidence: f64,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeFilters {
    pub limit: usize,
    pub min_confidence: f64,
    pub verified_only: bool,
}

impl Default for KnowledgeFilters {
    fn default() -> Self {
        Self {
            limit: 3,
            min_confidence: 0.0,
            verified_only: false,
        }
    }
}

pub trait KnowledgeService: Send + Sync {
    /// 返回不超过 `filters.limit` 条结果
    fn search(
        &self,
        topic: &str,
        filters: &KnowledgeFilters,
    ) -> Result<Vec<KnowledgeQueryResult>, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpeakOptions {
    pub voice: Option<String>,
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListenOptions {
    pub prompt: Option<String>,
    pub timeout: Duration,
}

pub trait VoiceService: Send + Sync {
    fn speak(&self, text: &str, options: &SpeakOptions) -> Result<(), ServiceError>;

    /// 返回识别出的文本
    fn listen(&self, options: &ListenOptions) -> Result<String, ServiceError>;
}

/// 没有知识库：总是返回空结果
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKnowledge;

impl KnowledgeService for NoKnowledge {
    fn search(
        &self,
        _topic: &str,
        _filters: &KnowledgeFilters,
    ) -> Result<Vec<KnowledgeQueryResult>, ServiceError> {
        Ok(Vec::new())
    }
}

/// 静态知识条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub topic: String,
    pub title: String,
    pub summary: String,
    pub confidence: f64,
    #[serde(default)]
    pub verified: bool,
}

/// 内存中的知识库，可从 JSON 加载
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticKnowledge {
    entries: Vec<KnowledgeEntry>,
}

impl StaticKnowledge {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KnowledgeService for StaticKnowledge {
    /// 主题或标题包含查询词（不区分大小写），按置信度降序
    fn search(
        &self,
        topic: &str,
        filters: &KnowledgeFilters,
    ) -> Result<Vec<KnowledgeQueryResult>, ServiceError> {
        let needle = topic.to_lowercase();
        let mut matches: Vec<&KnowledgeEntry> = self
            .entries
            .iter()
            .filter(|e| {
                e.topic.to_lowercase().contains(&needle) || e.title.to_lowercase().contains(&needle)
            })
            .filter(|e| e.confidence >= filters.min_confidence)
            .filter(|e| e.verified || !filters.verified_only)
            .collect();
        matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        Ok(matches
            .into_iter()
            .take(filters.limit)
            .map(|e| KnowledgeQueryResult {
                title: e.title.clone(),
                summary: e.summary.clone(),
                confidence: e.confidence.clamp(0.0, 1.0),
                verified: e.verified,
            })
            .collect())
    }
}

/// 不发声、听到空文本
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentVoice;

impl VoiceService for SilentVoice {
    fn speak(&self, _text: &str, _options: &SpeakOptions) -> Result<(), ServiceError> {
        Ok(())
    }

    fn listen(&self, _options: &ListenOptions) -> Result<String, ServiceError> {
        Ok(String::new())
    }
}

static NO_KNOWLEDGE: NoKnowledge = NoKnowledge;
static SILENT_VOICE: SilentVoice = SilentVoice;

/// 一次运行借用的协作服务
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub knowledge: &'a dyn KnowledgeService,
    pub voice: &'a dyn VoiceService,
}

impl<'a> Services<'a> {
    pub fn new(knowledge: &'a dyn KnowledgeService, voice: &'a dyn VoiceService) -> Self {
        Self { knowledge, voice }
    }

    pub fn with_knowledge(self, knowledge: &'a dyn KnowledgeService) -> Self {
        Self { knowledge, ..self }
    }

    pub fn with_voice(self, voice: &'a dyn VoiceService) -> Self {
        Self { voice, ..self }
    }
}

impl Default for Services<'static> {
    fn default() -> Self {
        Self {
            knowledge: &NO_KNOWLEDGE,
            voice: &SILENT_VOICE,
        }
    }
}

impl std::fmt::Debug for Services<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

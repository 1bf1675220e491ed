//! Prompt templates for Tubescribe.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.
//! Each feature carries a Korean and an English template; any other target
//! language is served by the English wording.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub summary: LocalizedPrompt,
    pub topics: LocalizedPrompt,
    pub translate: TranslatePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// A template with Korean and English wording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizedPrompt {
    pub ko: String,
    pub en: String,
}

impl LocalizedPrompt {
    /// Pick the template for a language code.
    pub fn for_language(&self, language: &str) -> &str {
        if language.eq_ignore_ascii_case("ko") {
            &self.ko
        } else {
            &self.en
        }
    }

    fn apply(&mut self, custom: LocalizedOverride) {
        if let Some(ko) = custom.ko {
            self.ko = ko;
        }
        if let Some(en) = custom.en {
            self.en = en;
        }
    }
}

/// Partial override read from a custom prompt file.
#[derive(Debug, Default, Deserialize)]
struct LocalizedOverride {
    ko: Option<String>,
    en: Option<String>,
}

fn default_summary_prompt() -> LocalizedPrompt {
    LocalizedPrompt {
        ko: r#"다음 YouTube 비디오 스크립트를 {{max_points}}개의 핵심 포인트로 요약해주세요.
각 포인트는 간결하고 명확하게 작성해주세요.
설명이나 추가 코멘트 없이 요약 결과만 출력하세요.

스크립트:
{{text}}

요약 형식:
1. [첫 번째 핵심 포인트]
2. [두 번째 핵심 포인트]
...

요약:"#
            .to_string(),
        en: r#"Please summarize the following YouTube video script into {{max_points}} key points in {{language_name}}.
Each point should be concise and clear.
Output only the summary, without any explanations or additional comments.

Script:
{{text}}

Summary format:
1. [First key point]
2. [Second key point]
...

Summary:"#
            .to_string(),
    }
}

fn default_topics_prompt() -> LocalizedPrompt {
    LocalizedPrompt {
        ko: r#"다음 YouTube 비디오 스크립트에서 핵심 주제 {{num_topics}}가지를 추출해주세요.
각 주제는 짧은 키워드나 구절로 표현해주세요.
설명이나 추가 코멘트 없이 주제 목록만 출력하세요.

스크립트:
{{text}}

출력 형식 (각 주제를 한 줄씩, 불릿 포인트 사용):
- [주제 1]
- [주제 2]
...

주제:"#
            .to_string(),
        en: r#"Extract {{num_topics}} key topics from the following YouTube video script, written in {{language_name}}.
Express each topic as a short keyword or phrase.
Output only the topic list, without any explanations or additional comments.

Script:
{{text}}

Output format (one topic per line, use bullet points):
- [Topic 1]
- [Topic 2]
...

Topics:"#
            .to_string(),
    }
}

/// Translation prompts, with and without a known source language.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatePrompts {
    pub with_source: String,
    pub auto_detect: String,
}

impl Default for TranslatePrompts {
    fn default() -> Self {
        Self {
            with_source: r#"Translate the following {{source_language}} text to {{target_language}}.
Output only the translation, without any explanations or additional comments.

Original text:
{{text}}

Translation:"#
                .to_string(),
            auto_detect: r#"Translate the following text to {{target_language}}.
Output only the translation, without any explanations or additional comments.

Original text:
{{text}}

Translation:"#
                .to_string(),
        }
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            summary: default_summary_prompt(),
            topics: default_topics_prompt(),
            translate: TranslatePrompts::default(),
            variables: HashMap::new(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary.apply(toml::from_str(&content)?);
            }

            let topics_path = custom_path.join("topics.toml");
            if topics_path.exists() {
                let content = std::fs::read_to_string(&topics_path)?;
                prompts.topics.apply(toml::from_str(&content)?);
            }

            let translate_path = custom_path.join("translate.toml");
            if translate_path.exists() {
                let content = std::fs::read_to_string(&translate_path)?;
                prompts.translate = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

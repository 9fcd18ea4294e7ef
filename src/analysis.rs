//! # 请求组装与响应校验
//!
//! ## 设计思路
//!
//! 规范化后的图片与提示词在这里组装成推理请求体；网络调用本身不在本 crate 内。
//! 模型返回的文本经去围栏、JSON 解析与字段类型校验后才会交给展示层。
//!
//! ## 实现思路
//!
//! - `AnalysisRequest` 可直接 `serde_json` 序列化。
//! - `parse_analysis_response` 容忍 ```json 围栏；意图不一致时以请求意图为准并记录告警。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::intent::{build_prompt, IntentType};
use crate::submission::{ImageRole, NormalizedSet};

const DEFAULT_MODEL: &str = "gemini-2.5-flash";

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^```(?:json)?\s*|\s*```\s*$").expect("code fence pattern is valid")
});

/// 结构化输出约束：五个字段全部必填。
static RESPONSE_SCHEMA: Lazy<serde_json::Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "intentType": {
                "type": "STRING",
                "description": "生徒が選択した意図。"
            },
            "hasError": {
                "type": "BOOLEAN",
                "description": "計算ミスや概念の間違いがあったかどうか。"
            },
            "errorLocation": {
                "type": "STRING",
                "description": "ミスの具体的な場所。ミスがない場合は空文字列。"
            },
            "errorExplanation": {
                "type": "STRING",
                "description": "なぜミスなのか、物理的・数学的に丁寧に説明。"
            },
            "correctiveSuggestion": {
                "type": "STRING",
                "description": "より良い解法、防止策、賞賛、発展的アドバイスなど。"
            }
        },
        "required": [
            "intentType",
            "hasError",
            "errorLocation",
            "errorExplanation",
            "correctiveSuggestion"
        ]
    })
});

/// 请求中的单张内联图片。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub role: ImageRole,
    pub mime_type: &'static str,
    /// Base64 正文，不含 `data:` 前缀。
    pub data: String,
}

/// 生成参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub model: String,
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            response_mime_type: "application/json".to_string(),
            response_schema: RESPONSE_SCHEMA.clone(),
            temperature: 0.4,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

/// 完整推理请求体。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub intent: IntentType,
    pub prompt: String,
    pub images: Vec<InlineImage>,
    pub settings: GenerationSettings,
}

impl AnalysisRequest {
    /// 由规范化结果与意图组装请求，图片按固定角色顺序排列。
    pub fn build(intent: IntentType, images: &NormalizedSet, settings: GenerationSettings) -> Result<Self, AppError> {
        if images.is_empty() {
            return Err(AppError::InvalidSubmission("至少需要一张图片".to_string()));
        }

        let prompt = build_prompt(intent, &images.roles());
        let images = images
            .iter()
            .map(|(role, image)| InlineImage {
                role,
                mime_type: image.mime_type(),
                data: image.to_base64(),
            })
            .collect();

        Ok(Self {
            intent,
            prompt,
            images,
            settings,
        })
    }
}

/// 模型返回的结构化点评。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub intent_type: String,
    pub has_error: bool,
    pub error_location: String,
    pub error_explanation: String,
    pub corrective_suggestion: String,
}

/// 解析并校验模型返回的文本。
pub fn parse_analysis_response(raw: &str, expected: IntentType) -> Result<AnalysisResult, AppError> {
    let cleaned = CODE_FENCE.replace_all(raw.trim(), "");

    let value: serde_json::Value = serde_json::from_str(&cleaned).map_err(|e| {
        log::error!("❌ 模型响应不是合法 JSON：{}", e);
        AppError::InvalidResponse(format!("JSON 解析失败：{}", e))
    })?;

    let serde_json::Value::Object(mut fields) = value else {
        log::error!("❌ 模型响应不是 JSON 对象");
        return Err(AppError::InvalidResponse("响应顶层必须是 JSON 对象".to_string()));
    };

    // 意图以请求为准，先覆盖再做字段校验。
    let returned = fields.get("intentType").and_then(serde_json::Value::as_str);
    if returned != Some(expected.key()) {
        log::warn!(
            "⚠️ 模型返回的意图不一致（期望 {}，实际 {}），以请求意图为准",
            expected.key(),
            returned.unwrap_or("<缺失>")
        );
        fields.insert("intentType".to_string(), json!(expected.key()));
    }

    let result: AnalysisResult =
        serde_json::from_value(serde_json::Value::Object(fields)).map_err(|e| {
            log::error!("❌ 模型响应字段缺失或类型不符：{}", e);
            AppError::InvalidResponse(format!("字段校验失败：{}", e))
        })?;

    Ok(result)
}

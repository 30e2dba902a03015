// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Generation request: the JSON body a client posts to the relay.

use serde::{Deserialize, Serialize};

use crate::compose::{compose_prompt, ComposedPrompt, Length, Tone};
use crate::template::find_template;

/// Why a request was rejected before any upstream call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("unknown template \"{0}\" and no basePrompt given")]
    UnknownTemplate(String),
}

/// One generation: what to write about and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub template: String,
    pub topic: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub length: String,
    /// Lead-in phrase supplied by the client. Takes precedence over the
    /// catalogue entry for `template`.
    #[serde(rename = "basePrompt", default, skip_serializing_if = "Option::is_none")]
    pub base_prompt: Option<String>,
}

impl GenerationRequest {
    /// A request for a catalogue template, carrying that template's lead-in.
    pub fn new(template: &str, topic: &str, tone: Tone, length: Length) -> Self {
        Self {
            template: template.to_string(),
            topic: topic.to_string(),
            tone: tone.key().to_string(),
            length: length.key().to_string(),
            base_prompt: find_template(template).map(|t| t.prompt.to_string()),
        }
    }

    /// The topic with surrounding whitespace removed.
    pub fn trimmed_topic(&self) -> &str {
        self.topic.trim()
    }

    /// The lead-in phrase: `basePrompt` if non-empty, else the template's.
    pub fn lead_in(&self) -> Result<&str, RequestError> {
        if let Some(base) = self.base_prompt.as_deref().map(str::trim) {
            if !base.is_empty() {
                return Ok(base);
            }
        }
        find_template(&self.template)
            .map(|t| t.prompt)
            .ok_or_else(|| RequestError::UnknownTemplate(self.template.clone()))
    }

    /// Check the request without building anything.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.trimmed_topic().is_empty() {
            return Err(RequestError::EmptyTopic);
        }
        self.lead_in().map(|_| ())
    }

    /// Validate and build the upstream instruction.
    pub fn compose(&self) -> Result<ComposedPrompt, RequestError> {
        self.validate()?;
        Ok(compose_prompt(
            self.lead_in()?,
            self.trimmed_topic(),
            &self.tone,
            &self.length,
        ))
    }
}

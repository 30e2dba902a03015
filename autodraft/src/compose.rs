// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Prompt composer
//
// Responsibilities:
// - Map tone and length keys onto fixed guidance sentences
// - Fall back silently to professional / medium for unknown keys
// - Assemble the single instruction string sent upstream

use std::fmt;

// ---------------------------------------------------------------------------
// Tone
// ---------------------------------------------------------------------------

/// Writing tone requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Friendly,
    Formal,
    Creative,
    Persuasive,
}

impl Tone {
    pub const ALL: [Tone; 6] = [
        Tone::Professional,
        Tone::Casual,
        Tone::Friendly,
        Tone::Formal,
        Tone::Creative,
        Tone::Persuasive,
    ];

    /// Look up a tone by its wire key. Unknown keys map to `Professional`.
    pub fn from_key(key: &str) -> Self {
        match key {
            "professional" => Tone::Professional,
            "casual" => Tone::Casual,
            "friendly" => Tone::Friendly,
            "formal" => Tone::Formal,
            "creative" => Tone::Creative,
            "persuasive" => Tone::Persuasive,
            _ => Tone::default(),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Friendly => "friendly",
            Tone::Formal => "formal",
            Tone::Creative => "creative",
            Tone::Persuasive => "persuasive",
        }
    }

    /// The guidance sentence appended to the prompt for this tone.
    pub fn guidance(self) -> &'static str {
        match self {
            Tone::Professional => {
                "Write in a professional, polished tone suitable for business contexts."
            }
            Tone::Casual => {
                "Write in a casual, conversational tone that feels friendly and approachable."
            }
            Tone::Friendly => "Write in a warm, friendly tone that connects with readers.",
            Tone::Formal => "Write in a formal, academic tone with proper structure.",
            Tone::Creative => "Write in a creative, imaginative tone that engages readers.",
            Tone::Persuasive => "Write in a persuasive tone that convinces and motivates readers.",
        }
    }
}

// ---------------------------------------------------------------------------
// Length
// ---------------------------------------------------------------------------

/// Target length bucket requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Length {
    Short,
    #[default]
    Medium,
    Long,
    VeryLong,
}

impl Length {
    pub const ALL: [Length; 4] = [Length::Short, Length::Medium, Length::Long, Length::VeryLong];

    /// Look up a length bucket by its wire key. Unknown keys map to `Medium`.
    pub fn from_key(key: &str) -> Self {
        match key {
            "short" => Length::Short,
            "medium" => Length::Medium,
            "long" => Length::Long,
            "very-long" => Length::VeryLong,
            _ => Length::default(),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Length::Short => "short",
            Length::Medium => "medium",
            Length::Long => "long",
            Length::VeryLong => "very-long",
        }
    }

    /// The word-count instruction appended to the prompt for this bucket.
    pub fn guidance(self) -> &'static str {
        match self {
            Length::Short => "Keep it concise, around 200-300 words.",
            Length::Medium => "Write a medium-length piece, around 400-600 words.",
            Length::Long => "Write a comprehensive piece, around 800-1000 words.",
            Length::VeryLong => "Write an extensive, detailed piece of 1200+ words.",
        }
    }
}

// ---------------------------------------------------------------------------
// Composed prompt
// ---------------------------------------------------------------------------

/// Formatting directives appended to every prompt so the output renders as Markdown.
pub const FORMAT_DIRECTIVES: &str = "Format the content with proper markdown formatting including:
- Clear headings (use ##, ###)
- Bullet points where appropriate
- Bold text for emphasis
- Proper paragraphs with spacing

Make it engaging, well-structured, and valuable to readers.";

/// The instruction string sent to the upstream model. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt(String);

impl ComposedPrompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ComposedPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the instruction for a lead-in phrase, a topic, and tone/length keys.
///
/// The topic is quoted verbatim; it is natural-language content, never
/// interpreted as markup on this side.
pub fn compose_prompt(lead_in: &str, topic: &str, tone: &str, length: &str) -> ComposedPrompt {
    let tone = Tone::from_key(tone);
    let length = Length::from_key(length);
    ComposedPrompt(format!(
        "{lead_in} \"{topic}\". {} {}\n\n{FORMAT_DIRECTIVES}",
        tone.guidance(),
        length.guidance()
    ))
}

// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Template catalogue: the fixed set of content templates offered to users.

/// A content template: the lead-in phrase the prompt starts with, plus the
/// display metadata a client shows next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
    pub placeholder: &'static str,
}

pub const TEMPLATES: &[Template] = &[
    Template {
        id: "blog",
        name: "Blog Post",
        prompt: "Write a comprehensive blog post about",
        placeholder: "e.g., benefits of meditation for mental health",
    },
    Template {
        id: "article",
        name: "Article",
        prompt: "Write a detailed article about",
        placeholder: "e.g., future of renewable energy",
    },
    Template {
        id: "email",
        name: "Email",
        prompt: "Write a professional email about",
        placeholder: "e.g., requesting a meeting with a client",
    },
    Template {
        id: "social",
        name: "Social Media",
        prompt: "Create engaging social media content about",
        placeholder: "e.g., launching a new product",
    },
    Template {
        id: "product",
        name: "Product Description",
        prompt: "Write a compelling product description for",
        placeholder: "e.g., ergonomic office chair",
    },
    Template {
        id: "creative",
        name: "Creative Writing",
        prompt: "Write a creative piece about",
        placeholder: "e.g., a journey through space",
    },
    Template {
        id: "ideas",
        name: "Ideas & Brainstorm",
        prompt: "Generate creative ideas for",
        placeholder: "e.g., marketing campaign for eco-friendly products",
    },
];

/// Find a template by id.
pub fn find_template(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// The template selected when nothing else has been chosen.
pub fn default_template() -> &'static Template {
    &TEMPLATES[0]
}

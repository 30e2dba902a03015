// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

pub mod client;
pub mod compose;
pub mod config;
pub mod provider;
pub mod proxy;
pub mod relay;
pub mod request;
pub mod template;
pub mod upstream;

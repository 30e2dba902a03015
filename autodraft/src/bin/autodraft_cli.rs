// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// autodraft-cli: run one generation against a running relay.
//
// Usage:
//   autodraft-cli --topic "cats"
//   autodraft-cli --template email --tone formal --length long --topic "Q3 review" --save
//   autodraft-cli --topic "cats" --out cats.md
//   autodraft-cli --list-templates

use std::io::Write as _;
use std::path::PathBuf;

use clap::Parser;

use autodraft::client::{download_file_name, ClientError, RelayClient};
use autodraft::compose::{Length, Tone};
use autodraft::request::GenerationRequest;
use autodraft::template::{default_template, TEMPLATES};

#[derive(Parser)]
#[command(
    name = "autodraft-cli",
    about = "Generate content through a running autodraft relay."
)]
struct Cli {
    /// Relay root URL.
    #[arg(long, default_value = "http://127.0.0.1:9800", env = "AUTODRAFT_URL")]
    url: String,

    /// Template id (see --list-templates).
    #[arg(long, default_value_t = default_template().id.to_string())]
    template: String,

    /// What to write about.
    #[arg(long, required_unless_present = "list_templates")]
    topic: Option<String>,

    /// professional | casual | friendly | formal | creative | persuasive
    #[arg(long, default_value = "professional")]
    tone: String,

    /// short | medium | long | very-long
    #[arg(long, default_value = "medium")]
    length: String,

    /// Write the finished text to this file.
    #[arg(long, value_name = "PATH", conflicts_with = "save")]
    out: Option<PathBuf>,

    /// Save the finished text as <template>-<unix-millis>.md.
    #[arg(long)]
    save: bool,

    /// Print the template catalogue and exit.
    #[arg(long)]
    list_templates: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    if cli.list_templates {
        for t in TEMPLATES {
            println!("{:<10} {:<18} {}", t.id, t.name, t.placeholder);
        }
        return;
    }

    let Some(topic) = cli.topic.as_deref() else {
        tracing::error!("--topic is required");
        std::process::exit(2);
    };

    let request = GenerationRequest::new(
        &cli.template,
        topic,
        Tone::from_key(&cli.tone),
        Length::from_key(&cli.length),
    );
    if let Err(e) = request.validate() {
        tracing::error!("{e}");
        std::process::exit(2);
    }

    let client = RelayClient::new(reqwest::Client::new(), &cli.url);
    tracing::info!(endpoint = client.endpoint(), template = %cli.template, "generating");

    // The callback sees the whole text so far; print only the new tail.
    let mut printed = 0;
    let result = client
        .generate(&request, |content| {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(content[printed..].as_bytes());
            let _ = stdout.flush();
            printed = content.len();
        })
        .await;
    println!();

    let content = match result {
        Ok(content) => content,
        Err(ClientError::Failed { reason, partial }) => {
            tracing::error!(received_bytes = partial.len(), "{reason}");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    let target = match (cli.out, cli.save) {
        (Some(path), _) => Some(path),
        (None, true) => Some(PathBuf::from(download_file_name(
            &cli.template,
            chrono::Utc::now(),
        ))),
        (None, false) => None,
    };

    if let Some(path) = target {
        if let Err(e) = std::fs::write(&path, &content) {
            tracing::error!(path = %path.display(), "failed to save: {e}");
            std::process::exit(1);
        }
        tracing::info!(path = %path.display(), bytes = content.len(), "saved");
    }
}

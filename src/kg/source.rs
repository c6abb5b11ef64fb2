use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::graph::GraphPayload;
use super::parse::parse_graph_payload;

/// Supplies `{nodes, edges}` payloads on demand. Called from a background loader thread.
pub trait GraphSource: Send + Sync {
    fn describe(&self) -> String;

    fn fetch(&self) -> Result<GraphPayload>;
}

/// Reads a payload from a JSON file, or from stdin when the path is `-`.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }

    fn read_raw(&self) -> Result<String> {
        if self.is_stdin() {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read graph payload from stdin")?;
            return Ok(raw);
        }

        std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read graph payload from {}", self.path.display()))
    }
}

impl GraphSource for FileSource {
    fn describe(&self) -> String {
        if self.is_stdin() {
            "stdin".to_owned()
        } else {
            self.path.display().to_string()
        }
    }

    fn fetch(&self) -> Result<GraphPayload> {
        let raw = self.read_raw()?;
        let payload = parse_graph_payload(&raw)
            .with_context(|| format!("invalid graph payload in {}", self.describe()))?;

        log::info!(
            "loaded {} entities and {} relations from {}",
            payload.entities.len(),
            payload.relations.len(),
            self.describe()
        );
        Ok(payload)
    }
}

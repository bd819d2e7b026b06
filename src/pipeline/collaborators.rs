//! Contracts for the model-backed collaborators each stage delegates to, and
//! implementations that drive them as external processes.

use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::QuestionType;
use crate::store::artifact::RetrievedDocument;

/// Type and entity mentions for one question.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Analysis {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub entities: Vec<String>,
}

pub trait QuestionAnalyzer {
    fn analyze(&self, question: &str) -> Result<Analysis>;
}

pub trait DocumentSearcher {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedDocument>>;
}

/// Starts answer extraction for one answer type. The extractor reads the
/// SQuAD-style `input` file and eventually writes `predictions.json` into
/// `output_dir`; the caller waits for that file.
pub trait AnswerExtractor {
    fn launch(
        &self,
        question_type: QuestionType,
        input: &Path,
        output_dir: &Path,
    ) -> Result<Launched>;
}

/// Handle on a started extraction.
#[derive(Debug)]
pub struct Launched {
    child: Option<Child>,
}

impl Launched {
    /// For extractors that finish before `launch` returns.
    pub fn completed() -> Self {
        Self { child: None }
    }

    pub fn process(child: Child) -> Self {
        Self { child: Some(child) }
    }

    /// Waits for the process after its output has appeared.
    pub fn reap(mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().context("failed to wait for answer extractor")?;
        if !status.success() {
            warn!(status = %status, "answer extractor exited with failure");
        }
        Ok(())
    }

    /// Stops a process whose output never appeared.
    pub fn abandon(mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill() {
                debug!(error = %err, "answer extractor already exited");
            }
            let _ = child.wait();
        }
    }
}

/// A program plus arguments with `{name}` placeholders.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
    placeholder: Regex,
}

impl CommandTemplate {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            bail!("collaborator command is empty");
        };
        let placeholder =
            Regex::new(r"\{([a-z_]+)\}").context("failed to compile placeholder regex")?;
        Ok(Self {
            program,
            args: parts.collect(),
            placeholder,
        })
    }

    pub fn expand(&self, vars: &[(&str, &str)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                self.placeholder
                    .replace_all(arg, |caps: &regex::Captures| {
                        let name = &caps[1];
                        vars.iter()
                            .find(|(key, _)| *key == name)
                            .map(|(_, value)| value.to_string())
                            .unwrap_or_else(|| caps[0].to_string())
                    })
                    .into_owned()
            })
            .collect()
    }

    pub fn command(&self, vars: &[(&str, &str)]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.expand(vars));
        command
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Runs `template`, writes `input` as JSON to its stdin and parses its stdout
/// as JSON.
fn exchange_json<I, O>(template: &CommandTemplate, input: &I) -> Result<O>
where
    I: Serialize,
    O: DeserializeOwned,
{
    let payload = serde_json::to_vec(input).context("failed to serialize collaborator input")?;

    let mut child = template
        .command(&[])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to execute {}", template.program()))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(&payload)
            .with_context(|| format!("failed to write input to {}", template.program()))?;
    }

    let output = child
        .wait_with_output()
        .with_context(|| format!("failed to wait for {}", template.program()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} returned non-zero exit status: {}",
            template.program(),
            stderr.trim()
        );
    }

    serde_json::from_slice(&output.stdout)
        .with_context(|| format!("failed to parse output of {}", template.program()))
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    question: &'a str,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
}

/// Question analyzer reached through a command that reads
/// `{"question": ...}` and prints `{"type": ..., "entities": [...]}`.
#[derive(Debug, Clone)]
pub struct ExternalAnalyzer {
    template: CommandTemplate,
}

impl ExternalAnalyzer {
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }
}

impl QuestionAnalyzer for ExternalAnalyzer {
    fn analyze(&self, question: &str) -> Result<Analysis> {
        exchange_json(&self.template, &AnalyzeRequest { question })
    }
}

/// Searcher reached through a command that reads `{"query": ..., "limit": n}`
/// and prints a JSON array of documents.
#[derive(Debug, Clone)]
pub struct ExternalSearcher {
    template: CommandTemplate,
}

impl ExternalSearcher {
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }
}

impl DocumentSearcher for ExternalSearcher {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedDocument>> {
        let mut documents: Vec<RetrievedDocument> =
            exchange_json(&self.template, &SearchRequest { query, limit })?;
        documents.truncate(limit);
        Ok(documents)
    }
}

/// Extractor started as a background process with `{type}`, `{input}` and
/// `{output_dir}` substituted into its arguments.
#[derive(Debug, Clone)]
pub struct ExternalExtractor {
    template: CommandTemplate,
}

impl ExternalExtractor {
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }
}

impl AnswerExtractor for ExternalExtractor {
    fn launch(
        &self,
        question_type: QuestionType,
        input: &Path,
        output_dir: &Path,
    ) -> Result<Launched> {
        let input = input.display().to_string();
        let output_dir = output_dir.display().to_string();
        let vars = [
            ("type", question_type.as_str()),
            ("input", input.as_str()),
            ("output_dir", output_dir.as_str()),
        ];

        let child = self
            .template
            .command(&vars)
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| {
                format!(
                    "failed to start {} for {} questions",
                    self.template.program(),
                    question_type
                )
            })?;
        debug!(
            program = %self.template.program(),
            question_type = %question_type,
            pid = child.id(),
            "answer extractor started"
        );
        Ok(Launched::process(child))
    }
}

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_RETRIEVAL_LIMIT, DEFAULT_SNIPPET_LIMIT,
    DEFAULT_STAGE_TIMEOUT_SECS, DEFAULT_XML_NAME, DatasetVariant, EvaluationConfig,
};
use crate::evaluation::EvalScope;
use crate::pipeline::{GenerationLayout, IrSubstitution, RunMode};

#[derive(Parser, Debug)]
#[command(
    name = "bioqa",
    version,
    about = "Biomedical QA pipeline runner and evaluation harness"
)]
pub struct Cli {
    /// Log per-question detail.
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score a generation folder against the gold dataset.
    Evaluate(EvaluateArgs),
    /// Run QU, IR and QA over a question list.
    Pipeline(PipelineArgs),
    /// Answer one question interactively.
    Ask(AskArgs),
    /// Write the gold QU and gold IR stand-in artifacts.
    GoldArtifacts(GoldArtifactsArgs),
    /// Write per-question 0/1 match files for significance testing.
    Significance(SignificanceArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    #[arg(long, default_value = "tmp")]
    pub gen_folder: PathBuf,

    #[arg(long, default_value = DEFAULT_XML_NAME)]
    pub xml_name: String,

    #[arg(long, value_enum, default_value_t = DatasetVariant::GoldenEnriched)]
    pub dataset: DatasetVariant,

    /// Overrides the dataset variant's default gold path.
    #[arg(long)]
    pub gold_path: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_SNIPPET_LIMIT)]
    pub snippet_limit: usize,
}

impl DatasetArgs {
    pub fn config(&self, verbose: bool) -> EvaluationConfig {
        EvaluationConfig {
            verbose,
            dataset_variant: self.dataset,
            gold_path: self
                .gold_path
                .clone()
                .unwrap_or_else(|| self.dataset.default_gold_path()),
            xml_name: self.xml_name.clone(),
            snippet_limit: self.snippet_limit,
            ..EvaluationConfig::default()
        }
    }

    pub fn layout(&self) -> GenerationLayout {
        GenerationLayout::new(self.gen_folder.clone(), self.xml_name.clone())
    }
}

#[derive(Args, Debug, Clone)]
pub struct CollaboratorArgs {
    /// Question analyzer command; reads {"question"} JSON on stdin.
    #[arg(long)]
    pub analyzer_cmd: Option<String>,

    /// Document search command; reads {"query","limit"} JSON on stdin.
    #[arg(long)]
    pub searcher_cmd: Option<String>,

    /// Answer extractor command; `{type}`, `{input}` and `{output_dir}` are
    /// substituted.
    #[arg(long)]
    pub extractor_cmd: Option<String>,

    #[arg(long, default_value_t = DEFAULT_STAGE_TIMEOUT_SECS)]
    pub stage_timeout_secs: u64,

    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    #[arg(long, default_value_t = DEFAULT_RETRIEVAL_LIMIT)]
    pub retrieval_limit: usize,
}

impl CollaboratorArgs {
    pub fn apply(&self, config: &mut EvaluationConfig) {
        config.stage_timeout = Duration::from_secs(self.stage_timeout_secs);
        config.poll_interval = Duration::from_millis(self.poll_interval_ms);
        config.retrieval_limit = self.retrieval_limit;
    }
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[arg(long, value_enum, default_value_t = EvalScope::All)]
    pub scope: EvalScope,

    /// Run tag appended to every report file name.
    #[arg(long, default_value = "run")]
    pub tag: String,

    /// Directory that receives `test_results/<date>/`; defaults to the
    /// working directory.
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Score this QU artifact instead of the generation folder's.
    #[arg(long)]
    pub qu_artifact: Option<PathBuf>,

    /// Score this IR artifact instead of the generation folder's.
    #[arg(long)]
    pub ir_artifact: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub collaborators: CollaboratorArgs,

    #[arg(long, value_enum, default_value_t = RunMode::Full)]
    pub mode: RunMode,

    /// Question list (JSON `questions` array or `ID,Question` CSV); defaults
    /// to the gold dataset's questions.
    #[arg(long)]
    pub questions: Option<PathBuf>,

    /// Feed IR the gold QU artifact.
    #[arg(long, default_value_t = false)]
    pub gold_qu: bool,

    /// Feed QA a gold IR artifact built from abstracts or snippets.
    #[arg(long, value_enum)]
    pub gold_ir: Option<IrSubstitution>,

    /// Score the run's artifacts afterwards.
    #[arg(long, default_value_t = false)]
    pub evaluate: bool,

    #[arg(long, default_value = "run")]
    pub tag: String,
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub collaborators: CollaboratorArgs,

    pub question: String,
}

#[derive(Args, Debug, Clone)]
pub struct GoldArtifactsArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// QU-shaped artifact the gold IR artifacts are built on; defaults to the
    /// freshly written gold QU artifact.
    #[arg(long)]
    pub base: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SignificanceArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
}

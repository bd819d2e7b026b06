//! QU → IR → QA stage orchestration with optional gold substitution at each
//! stage boundary.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EvaluationConfig;
use crate::model::{ExactAnswer, PendingQuestion, QaData, QaInput, QaItem, QaParagraph, QuestionType};
use crate::store::artifact::{ArtifactQuestion, QuestionProcessing, Retrieval};
use crate::store::{RecordSet, load_prediction_answers};

pub mod collaborators;
pub mod gold;
pub mod layout;
pub mod stages;

pub use collaborators::{AnswerExtractor, DocumentSearcher, QuestionAnalyzer};
pub use layout::GenerationLayout;
pub use stages::{AnswerWait, QaOutcome, StageTally};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    QuestionUnderstanding,
    InformationRetrieval,
    QuestionAnswering,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QuestionUnderstanding => "QU",
            Self::InformationRetrieval => "IR",
            Self::QuestionAnswering => "QA",
        }
    }
}

/// Contiguous stage ranges the pipeline can run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    Full,
    QuOnly,
    IrOnly,
    QaOnly,
    QuIr,
    IrQa,
}

impl RunMode {
    pub fn stages(self) -> &'static [Stage] {
        use Stage::*;
        match self {
            Self::Full => &[QuestionUnderstanding, InformationRetrieval, QuestionAnswering],
            Self::QuOnly => &[QuestionUnderstanding],
            Self::IrOnly => &[InformationRetrieval],
            Self::QaOnly => &[QuestionAnswering],
            Self::QuIr => &[QuestionUnderstanding, InformationRetrieval],
            Self::IrQa => &[InformationRetrieval, QuestionAnswering],
        }
    }

    pub fn includes(self, stage: Stage) -> bool {
        self.stages().contains(&stage)
    }
}

/// Gold text that stands in for a retrieved abstract.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IrSubstitution {
    Abstracts,
    Snippets,
}

/// Which stage outputs are synthesized from the gold dataset instead of
/// produced by the live collaborators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GoldSubstitution {
    pub qu: bool,
    pub ir: Option<IrSubstitution>,
}

impl GoldSubstitution {
    pub fn is_active(&self) -> bool {
        self.qu || self.ir.is_some()
    }
}

/// The live collaborators a run may call.
pub struct Collaborators<'a> {
    pub analyzer: &'a dyn QuestionAnalyzer,
    pub searcher: &'a dyn DocumentSearcher,
    pub extractor: &'a dyn AnswerExtractor,
}

/// What one pipeline run did and where its artifacts are.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub stages: Vec<Stage>,
    pub qu: Option<StageTally>,
    pub ir: Option<StageTally>,
    pub qa: Option<QaOutcome>,
    /// Artifact the IR stage consumed (QU output or its gold stand-in).
    pub ir_input: PathBuf,
    /// Artifact the QA stage consumed (IR output or its gold stand-in).
    pub qa_input: PathBuf,
}

impl PipelineReport {
    /// Processed and skipped counts of every stage that ran live.
    pub fn tallies(&self) -> Vec<(Stage, StageTally)> {
        [
            (Stage::QuestionUnderstanding, self.qu),
            (Stage::InformationRetrieval, self.ir),
            (
                Stage::QuestionAnswering,
                self.qa.as_ref().map(|outcome| outcome.tally),
            ),
        ]
        .into_iter()
        .filter_map(|(stage, tally)| tally.map(|tally| (stage, tally)))
        .collect()
    }
}

pub struct Orchestrator<'a> {
    config: &'a EvaluationConfig,
    layout: GenerationLayout,
    collaborators: Collaborators<'a>,
    substitution: GoldSubstitution,
    gold: Option<&'a RecordSet>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a EvaluationConfig,
        layout: GenerationLayout,
        collaborators: Collaborators<'a>,
    ) -> Self {
        Self {
            config,
            layout,
            collaborators,
            substitution: GoldSubstitution::default(),
            gold: None,
        }
    }

    pub fn with_gold(mut self, gold: &'a RecordSet, substitution: GoldSubstitution) -> Self {
        self.gold = Some(gold);
        self.substitution = substitution;
        self
    }

    fn ir_input(&self) -> PathBuf {
        if self.substitution.qu {
            self.layout.gold_qu_output()
        } else {
            self.layout.qu_output()
        }
    }

    fn qa_input(&self) -> PathBuf {
        match self.substitution.ir {
            Some(variant) => self.layout.gold_ir_output(variant),
            None => self.layout.ir_output(),
        }
    }

    fn gold(&self) -> Result<&'a RecordSet> {
        match self.gold {
            Some(gold) => Ok(gold),
            None => bail!("gold substitution requested without a gold dataset"),
        }
    }

    fn wait(&self) -> AnswerWait {
        AnswerWait {
            timeout: self.config.stage_timeout,
            poll: self.config.poll_interval,
        }
    }

    fn write_gold_qu(&self) -> Result<PathBuf> {
        gold::write_gold_qu(&self.layout, self.gold()?)
    }

    /// Gold IR artifact built on top of whichever QU-shaped artifact the IR
    /// stage would have consumed.
    fn write_gold_ir(&self, variant: IrSubstitution) -> Result<PathBuf> {
        gold::write_gold_ir(
            &self.layout,
            self.gold()?,
            &self.ir_input(),
            variant,
            self.config.snippet_limit,
        )
    }

    pub fn run(&self, mode: RunMode, questions: &[PendingQuestion]) -> Result<PipelineReport> {
        let mut report = PipelineReport {
            stages: mode.stages().to_vec(),
            ir_input: self.ir_input(),
            qa_input: self.qa_input(),
            ..PipelineReport::default()
        };
        info!(
            mode = ?mode,
            gold_qu = self.substitution.qu,
            gold_ir = ?self.substitution.ir,
            root = %self.layout.root().display(),
            "pipeline run started"
        );

        if mode.includes(Stage::QuestionUnderstanding) {
            if self.substitution.qu {
                self.write_gold_qu()?;
            } else {
                if questions.is_empty() {
                    bail!("QU stage requires at least one question");
                }
                report.qu = Some(stages::run_question_understanding(
                    questions,
                    self.collaborators.analyzer,
                    &self.layout.qu_output(),
                )?);
            }
        } else if self.substitution.qu && mode.includes(Stage::InformationRetrieval) {
            self.write_gold_qu()?;
        }

        let qa_needs_gold_ir =
            mode.includes(Stage::QuestionAnswering) && self.substitution.ir.is_some();
        if mode.includes(Stage::InformationRetrieval) || qa_needs_gold_ir {
            match self.substitution.ir {
                Some(variant) => {
                    self.write_gold_ir(variant)?;
                }
                None => {
                    report.ir = Some(stages::run_information_retrieval(
                        &report.ir_input,
                        &self.layout.ir_output(),
                        self.collaborators.searcher,
                        self.config.retrieval_limit,
                    )?);
                }
            }
        }

        if mode.includes(Stage::QuestionAnswering) {
            report.qa = Some(stages::run_question_answering(
                &report.qa_input,
                &self.layout,
                self.collaborators.extractor,
                self.wait(),
            )?);
        }

        info!(mode = ?mode, "pipeline run complete");
        Ok(report)
    }

    /// Runs one question through all three stages without touching the batch
    /// artifacts.
    pub fn ask(&self, question: &str) -> Result<InteractiveAnswer> {
        let question = question.trim();
        if question.is_empty() {
            bail!("question is empty");
        }

        let analysis = self
            .collaborators
            .analyzer
            .analyze(question)
            .context("question analysis failed")?;
        let processing =
            QuestionProcessing::from_entities(analysis.question_type.as_str(), analysis.entities);

        let mut answer = InteractiveAnswer {
            id: INTERACTIVE_ID.to_string(),
            question: question.to_string(),
            question_type: analysis.question_type,
            entities: processing.entities.clone(),
            query: String::new(),
            documents: Vec::new(),
            answer: None,
        };

        let mut probe = ArtifactQuestion {
            id: answer.id.clone(),
            body: answer.question.clone(),
            processing: Some(processing),
            retrieval: None,
        };
        answer.query = stages::retrieval_query(&probe).to_string();
        let mut documents = self
            .collaborators
            .searcher
            .search(&answer.query, self.config.retrieval_limit)
            .context("document search failed")?;
        documents.truncate(self.config.retrieval_limit);
        answer.documents = documents.iter().map(|document| document.pmid.clone()).collect();
        probe.retrieval = Some(Retrieval {
            query_used: Some(answer.query.clone()),
            results: documents,
        });

        if answer.question_type == QuestionType::Summary {
            warn!("summary questions are not answered");
            return Ok(answer);
        }

        let qa_input = QaInput {
            data: vec![QaData {
                paragraphs: vec![QaParagraph {
                    context: stages::answer_context(&probe),
                    qas: vec![QaItem {
                        id: answer.id.clone(),
                        question: answer.question.clone(),
                    }],
                }],
            }],
        };

        let scratch = self.layout.interactive();
        let predictions = stages::extract_answers(
            answer.question_type,
            &qa_input,
            &scratch,
            self.collaborators.extractor,
            self.wait(),
        )?;
        let answers = load_prediction_answers(&[(answer.question_type, predictions)])?;
        answer.answer = answers
            .iter()
            .find(|candidate| candidate.id == answer.id)
            .map(|candidate| candidate.answer.clone());
        if answer.answer.is_none() {
            warn!(question_type = %answer.question_type, "extractor produced no answer");
        }
        Ok(answer)
    }
}

const INTERACTIVE_ID: &str = "interactive";

#[derive(Debug, Clone, Serialize)]
pub struct InteractiveAnswer {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub entities: Vec<String>,
    pub query: String,
    pub documents: Vec<String>,
    pub answer: Option<ExactAnswer>,
}

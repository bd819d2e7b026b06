use std::path::{Path, PathBuf};

use crate::model::QuestionType;
use crate::store::GeneratedSources;

use super::IrSubstitution;

const RANKED_ANSWER_FILE: &str = "BioASQform_BioASQ-answer.json";

/// On-disk layout of one generation folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationLayout {
    root: PathBuf,
    xml_name: String,
}

impl GenerationLayout {
    pub fn new(root: impl Into<PathBuf>, xml_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            xml_name: xml_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch layout for single-question runs, kept apart from batch output.
    pub fn interactive(&self) -> Self {
        Self::new(self.root.join("interactive"), self.xml_name.clone())
    }

    fn xml_stem(&self) -> &str {
        self.xml_name
            .strip_suffix(".xml")
            .unwrap_or(self.xml_name.as_str())
    }

    /// QU output, which is also the IR stage's input.
    pub fn qu_output(&self) -> PathBuf {
        self.root.join("ir").join("input").join(&self.xml_name)
    }

    /// IR output, which is also the QA stage's input.
    pub fn ir_output(&self) -> PathBuf {
        self.root.join("ir").join("output").join(&self.xml_name)
    }

    pub fn gold_qu_output(&self) -> PathBuf {
        self.root
            .join("ir")
            .join("input")
            .join(format!("{}_GOLD.xml", self.xml_stem()))
    }

    pub fn gold_ir_output(&self, variant: IrSubstitution) -> PathBuf {
        let suffix = match variant {
            IrSubstitution::Abstracts => "GOLD_ABSTRACTS",
            IrSubstitution::Snippets => "GOLD_SNIPPETS",
        };
        self.root
            .join("ir")
            .join("output")
            .join(format!("{}_{}.xml", self.xml_stem(), suffix))
    }

    pub fn qa_dir(&self, question_type: QuestionType) -> PathBuf {
        self.root.join("qa").join(question_type.as_str())
    }

    pub fn qa_input(&self, question_type: QuestionType) -> PathBuf {
        self.qa_dir(question_type).join("qa_input.json")
    }

    pub fn predictions(&self, question_type: QuestionType) -> PathBuf {
        self.qa_dir(question_type).join("predictions.json")
    }

    /// n-best answer file; only factoid and list extractors write one.
    pub fn ranked_answers(&self, question_type: QuestionType) -> Option<PathBuf> {
        match question_type {
            QuestionType::Factoid | QuestionType::List => {
                Some(self.qa_dir(question_type).join(RANKED_ANSWER_FILE))
            }
            QuestionType::YesNo | QuestionType::Summary => None,
        }
    }

    /// `<xml>_SIGNIFICANCE_TESTING[_<suffix>].txt` next to the IR output.
    pub fn significance_file(&self, suffix: Option<&str>) -> PathBuf {
        let name = match suffix {
            Some(suffix) => format!("{}_SIGNIFICANCE_TESTING_{}.txt", self.xml_stem(), suffix),
            None => format!("{}_SIGNIFICANCE_TESTING.txt", self.xml_stem()),
        };
        self.root.join("ir").join("output").join(name)
    }

    /// Generated answer files for every answerable type.
    pub fn answer_sources(&self) -> GeneratedSources {
        GeneratedSources {
            artifact: None,
            predictions: QuestionType::ANSWERABLE
                .iter()
                .map(|question_type| (*question_type, self.predictions(*question_type)))
                .collect(),
            ranked: QuestionType::ANSWERABLE
                .iter()
                .filter_map(|question_type| {
                    self.ranked_answers(*question_type)
                        .map(|path| (*question_type, path))
                })
                .collect(),
        }
    }
}

pub mod ask;
pub mod evaluate;
pub mod gold_artifacts;
pub mod pipeline;
pub mod significance;

use std::path::Path;

use anyhow::{Result, bail};

use crate::cli::CollaboratorArgs;
use crate::model::QuestionType;
use crate::pipeline::collaborators::{
    Analysis, CommandTemplate, ExternalAnalyzer, ExternalExtractor, ExternalSearcher, Launched,
};
use crate::pipeline::{AnswerExtractor, Collaborators, DocumentSearcher, QuestionAnalyzer};
use crate::store::artifact::RetrievedDocument;

/// Stand-in for a collaborator whose command was not given. Fails only when a
/// stage actually calls it.
struct Unconfigured(&'static str);

impl QuestionAnalyzer for Unconfigured {
    fn analyze(&self, _: &str) -> Result<Analysis> {
        bail!("stage needs {}, which was not given", self.0)
    }
}

impl DocumentSearcher for Unconfigured {
    fn search(&self, _: &str, _: usize) -> Result<Vec<RetrievedDocument>> {
        bail!("stage needs {}, which was not given", self.0)
    }
}

impl AnswerExtractor for Unconfigured {
    fn launch(&self, _: QuestionType, _: &Path, _: &Path) -> Result<Launched> {
        bail!("stage needs {}, which was not given", self.0)
    }
}

/// Collaborators built from the command templates on the command line.
struct ExternalCollaborators {
    analyzer: Box<dyn QuestionAnalyzer>,
    searcher: Box<dyn DocumentSearcher>,
    extractor: Box<dyn AnswerExtractor>,
}

impl ExternalCollaborators {
    fn from_args(args: &CollaboratorArgs) -> Result<Self> {
        let analyzer: Box<dyn QuestionAnalyzer> = match &args.analyzer_cmd {
            Some(raw) => Box::new(ExternalAnalyzer::new(CommandTemplate::parse(raw)?)),
            None => Box::new(Unconfigured("--analyzer-cmd")),
        };
        let searcher: Box<dyn DocumentSearcher> = match &args.searcher_cmd {
            Some(raw) => Box::new(ExternalSearcher::new(CommandTemplate::parse(raw)?)),
            None => Box::new(Unconfigured("--searcher-cmd")),
        };
        let extractor: Box<dyn AnswerExtractor> = match &args.extractor_cmd {
            Some(raw) => Box::new(ExternalExtractor::new(CommandTemplate::parse(raw)?)),
            None => Box::new(Unconfigured("--extractor-cmd")),
        };
        Ok(Self {
            analyzer,
            searcher,
            extractor,
        })
    }

    fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            analyzer: self.analyzer.as_ref(),
            searcher: self.searcher.as_ref(),
            extractor: self.extractor.as_ref(),
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::model::QuestionType;
use crate::pipeline::Stage;

/// Which collection a record was expected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSide {
    Gold,
    Generated,
}

impl RecordSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Generated => "generated",
        }
    }
}

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("conflicting answers for question {id}: {first} vs {second}")]
    MalformedAnswer {
        id: String,
        first: String,
        second: String,
    },

    #[error("question {id} has no {} record", .side.as_str())]
    MissingRecord { id: String, side: RecordSide },

    #[error("{} stage requires {}, which does not exist", .stage.as_str(), .path.display())]
    StagePrecondition { stage: Stage, path: PathBuf },

    #[error("gave up waiting for {} after {}s", .path.display(), .waited.as_secs())]
    StageTimeout { path: PathBuf, waited: Duration },

    #[error("answer type {} is not supported for scoring", .0.as_str())]
    UnsupportedAnswerType(QuestionType),

    #[error("unknown question type: {0:?}")]
    UnknownQuestionType(String),
}

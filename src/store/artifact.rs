use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};

use crate::util::ensure_parent_directory;

/// The XML document handed from QU to IR and from IR to QA.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageArtifact {
    pub questions: Vec<ArtifactQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactQuestion {
    pub id: String,
    pub body: String,
    pub processing: Option<QuestionProcessing>,
    pub retrieval: Option<Retrieval>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionProcessing {
    pub question_type: String,
    pub entities: Vec<String>,
    pub query: String,
}

impl QuestionProcessing {
    pub fn from_entities(question_type: &str, entities: Vec<String>) -> Self {
        let query = entities.join(" ");
        Self {
            question_type: question_type.to_string(),
            entities,
            query,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieval {
    pub query_used: Option<String>,
    pub results: Vec<RetrievedDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    #[serde(alias = "PMID")]
    pub pmid: String,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract", alias = "abstract_text")]
    pub abstract_text: String,
    #[serde(default, alias = "mesh_major")]
    pub mesh: Vec<String>,
}

pub fn read_artifact(path: &Path) -> Result<StageArtifact> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_artifact(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn write_artifact(path: &Path, artifact: &StageArtifact) -> Result<()> {
    ensure_parent_directory(path)?;
    let rendered = render_artifact(artifact)?;
    fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))
}

pub fn parse_artifact(raw: &str) -> Result<StageArtifact> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut artifact = StageArtifact::default();
    let mut stack = Vec::<String>::new();

    loop {
        match reader.read_event().context("malformed stage artifact xml")? {
            Event::Start(start) => {
                let name = element_name(start.name().as_ref());
                open_element(&mut artifact, &name, &start)?;
                stack.push(name);
            }
            Event::Empty(start) => {
                let name = element_name(start.name().as_ref());
                open_element(&mut artifact, &name, &start)?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .context("malformed text in stage artifact")?
                    .into_owned();
                assign_text(&mut artifact, &stack, value);
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(data.as_ref()).into_owned();
                assign_text(&mut artifact, &stack, value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(artifact)
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attribute(start: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.context("malformed xml attribute")?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .context("malformed xml attribute value")?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn open_element(artifact: &mut StageArtifact, name: &str, start: &BytesStart<'_>) -> Result<()> {
    match name {
        "Q" => artifact.questions.push(ArtifactQuestion {
            id: attribute(start, b"id")?.unwrap_or_default(),
            ..ArtifactQuestion::default()
        }),
        "QP" => {
            if let Some(question) = artifact.questions.last_mut() {
                question.processing.get_or_insert_with(QuestionProcessing::default);
            }
        }
        "IR" => {
            if let Some(question) = artifact.questions.last_mut() {
                question.retrieval.get_or_insert_with(Retrieval::default);
            }
        }
        "Result" => {
            let pmid = attribute(start, b"PMID")?.unwrap_or_default();
            if let Some(question) = artifact.questions.last_mut() {
                question
                    .retrieval
                    .get_or_insert_with(Retrieval::default)
                    .results
                    .push(RetrievedDocument {
                        pmid,
                        ..RetrievedDocument::default()
                    });
            }
        }
        _ => {}
    }
    Ok(())
}

fn assign_text(artifact: &mut StageArtifact, stack: &[String], value: String) {
    let Some(question) = artifact.questions.last_mut() else {
        return;
    };
    let Some(current) = stack.last() else {
        return;
    };

    match current.as_str() {
        "Q" => {
            if question.body.is_empty() {
                question.body = value;
            } else {
                question.body.push(' ');
                question.body.push_str(&value);
            }
        }
        "Type" | "Entities" | "Query" => {
            let processing = question
                .processing
                .get_or_insert_with(QuestionProcessing::default);
            match current.as_str() {
                "Type" => processing.question_type = value,
                "Entities" => processing.entities.push(value),
                _ => processing.query = value,
            }
        }
        "QueryUsed" => {
            question
                .retrieval
                .get_or_insert_with(Retrieval::default)
                .query_used = Some(value);
        }
        "Title" | "Abstract" | "Journal" | "Year" | "MeSH" => {
            let Some(document) = question
                .retrieval
                .as_mut()
                .and_then(|retrieval| retrieval.results.last_mut())
            else {
                return;
            };
            match current.as_str() {
                "Title" => document.title = value,
                "Abstract" => document.abstract_text = value,
                "Journal" => document.journal = Some(value),
                "Year" => document.year = Some(value),
                _ => document.mesh.push(value),
            }
        }
        _ => {}
    }
}

pub fn render_artifact(artifact: &StageArtifact) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("Input")))?;

    for question in &artifact.questions {
        let mut start = BytesStart::new("Q");
        start.push_attribute(("id", question.id.as_str()));
        writer.write_event(Event::Start(start))?;
        if !question.body.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&question.body)))?;
        }

        if let Some(processing) = &question.processing {
            writer.write_event(Event::Start(BytesStart::new("QP")))?;
            write_text_element(&mut writer, "Type", &processing.question_type)?;
            for entity in &processing.entities {
                write_text_element(&mut writer, "Entities", entity)?;
            }
            write_text_element(&mut writer, "Query", &processing.query)?;
            writer.write_event(Event::End(BytesEnd::new("QP")))?;
        }

        if let Some(retrieval) = &question.retrieval {
            if retrieval.query_used.is_none() && retrieval.results.is_empty() {
                writer.write_event(Event::Empty(BytesStart::new("IR")))?;
            } else {
                writer.write_event(Event::Start(BytesStart::new("IR")))?;
                if let Some(query_used) = &retrieval.query_used {
                    write_text_element(&mut writer, "QueryUsed", query_used)?;
                }
                for document in &retrieval.results {
                    write_document(&mut writer, document)?;
                }
                writer.write_event(Event::End(BytesEnd::new("IR")))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("Q")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Input")))?;
    String::from_utf8(writer.into_inner()).context("stage artifact xml is not valid utf-8")
}

fn write_document(writer: &mut Writer<Vec<u8>>, document: &RetrievedDocument) -> Result<()> {
    let mut start = BytesStart::new("Result");
    start.push_attribute(("PMID", document.pmid.as_str()));
    writer.write_event(Event::Start(start))?;
    if let Some(journal) = &document.journal {
        write_text_element(writer, "Journal", journal)?;
    }
    if let Some(year) = &document.year {
        write_text_element(writer, "Year", year)?;
    }
    write_text_element(writer, "Title", &document.title)?;
    write_text_element(writer, "Abstract", &document.abstract_text)?;
    for heading in &document.mesh {
        write_text_element(writer, "MeSH", heading)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Result")))?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    if text.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(name)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(name)))?;
        writer.write_event(Event::Text(BytesText::new(text)))?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
    }
    Ok(())
}

use crate::error::IngestError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub source_path: String,
    pub text: String,
}

pub trait DocumentExtractor {
    fn extract_text(&self, path: &Path) -> Result<LoadedDocument, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxExtractor;

impl DocumentExtractor for DocxExtractor {
    fn extract_text(&self, path: &Path) -> Result<LoadedDocument, IngestError> {
        let file = BufReader::new(File::open(path)?);
        let mut archive = zip::ZipArchive::new(file)?;

        // Headers, then the body, then footers, each in archive order.
        let names = archive.file_names().map(str::to_string).collect::<Vec<_>>();
        let headers = names.iter().filter(|name| is_part(name, "word/header"));
        let footers = names.iter().filter(|name| is_part(name, "word/footer"));

        let mut text = String::new();
        for part in headers
            .map(String::as_str)
            .chain(std::iter::once(DOCUMENT_PART))
            .chain(footers.map(String::as_str))
        {
            let mut xml = String::new();
            archive.by_name(part)?.read_to_string(&mut xml)?;
            text.push_str(&document_xml_to_text(&xml)?);
        }

        Ok(LoadedDocument {
            source_path: path.to_string_lossy().to_string(),
            text,
        })
    }
}

fn is_part(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".xml"))
        .is_some_and(|number| number.chars().all(|c| c.is_ascii_digit()))
}

pub fn extract_docx_text(path: &Path) -> Result<LoadedDocument, IngestError> {
    DocxExtractor.extract_text(path)
}

pub fn document_xml_to_text(xml: &str) -> Result<String, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                if element.name().as_ref() == b"w:t" {
                    in_run_text = true;
                }
            }
            Event::Empty(element) => match element.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::End(element) => match element.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Text(run) if in_run_text => text.push_str(&run.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

//! The ingestion pipeline: files -> parallel counting workers -> one sequential consumer.

use crate::index::DocumentRecord;
use crate::tokenizer::Tokenizer;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;
use walkdir::WalkDir;

const FILE_QUEUE: usize = 200;
const RECORD_QUEUE: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct InputDoc {
    pub name: String,
    #[serde(default)]
    pub classes: Vec<String>,
    pub body: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassFilter {
    /// Keep documents with at least one class.
    pub classy: bool,
    /// Keep documents without any class.
    pub classless: bool,
}

impl ClassFilter {
    /// With neither flag set every document is kept.
    pub fn keeps(&self, classes: &[String]) -> bool {
        if !self.classy && !self.classless {
            return true;
        }
        if classes.is_empty() { self.classless } else { self.classy }
    }
}

/// JSON and JSONL files under `input`, or `input` itself if it is a file.
pub fn collect_files(input: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

/// Documents from a JSON array, a single JSON object, or JSONL.
pub fn read_documents(file: &Path) -> Result<Vec<InputDoc>> {
    let f = File::open(file).with_context(|| format!("unable to open file: {}", file.display()))?;
    let reader = BufReader::new(f);

    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let mut docs = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            docs.push(serde_json::from_str(&line).with_context(|| format!("bad document in {}", file.display()))?);
        }
        return Ok(docs);
    }

    let json: serde_json::Value =
        serde_json::from_reader(reader).with_context(|| format!("bad json in {}", file.display()))?;
    let docs = match json {
        serde_json::Value::Array(arr) => arr.into_iter().map(serde_json::from_value).collect::<Result<_, _>>()?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => Vec::new(),
    };
    Ok(docs)
}

pub fn count_document(doc: InputDoc, tokenizer: &Tokenizer) -> DocumentRecord {
    let counts = tokenizer.count(&doc.body);
    DocumentRecord { name: doc.name, classes: doc.classes, length: counts.length, term_counts: counts.counts }
}

fn count_files(
    files: &Receiver<PathBuf>,
    records: &Sender<DocumentRecord>,
    tokenizer: &Tokenizer,
    filter: ClassFilter,
) -> Result<()> {
    for file in files.iter() {
        for doc in read_documents(&file)? {
            if !filter.keeps(&doc.classes) {
                continue;
            }
            if records.send(count_document(doc, tokenizer)).is_err() {
                // the consumer stopped early
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Parse and count `files` on `workers` threads while `consume` drains the records on the calling thread.
///
/// Counting order across workers is unspecified. Returns the consumer's result, or the first
/// counting error once the consumer has finished.
pub fn run_pipeline<T>(
    files: Vec<PathBuf>,
    tokenizer: &Tokenizer,
    filter: ClassFilter,
    workers: usize,
    consume: impl FnOnce(&Receiver<DocumentRecord>) -> Result<T>,
) -> Result<T> {
    let (file_tx, file_rx) = bounded::<PathBuf>(FILE_QUEUE);
    let (record_tx, record_rx) = bounded::<DocumentRecord>(RECORD_QUEUE);

    thread::scope(|scope| {
        scope.spawn(move || {
            for file in files {
                if file_tx.send(file).is_err() {
                    break;
                }
            }
        });

        let counters: Vec<_> = (0..workers.max(1))
            .map(|_| {
                let file_rx = file_rx.clone();
                let record_tx = record_tx.clone();
                scope.spawn(move || count_files(&file_rx, &record_tx, tokenizer, filter))
            })
            .collect();
        drop(file_rx);
        drop(record_tx);

        let consumed = consume(&record_rx);
        drop(record_rx);

        for counter in counters {
            counter.join().map_err(|_| anyhow!("counting worker panicked"))??;
        }
        consumed
    })
}

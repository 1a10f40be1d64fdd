//! TREC topics input and run-file output.

use crate::DocId;
use std::fmt;
use std::io::{BufRead, Write};

pub const DEFAULT_RUN_TAG: &str = "MY_IR_SYSTEM";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub text: String,
}

/// Parse `<query_id> <query text...>`. Blank lines yield `None`.
pub fn parse_topic_line(line: &str) -> Option<Topic> {
    let mut parts = line.split_whitespace();
    let id = parts.next()?.to_string();
    let text = parts.collect::<Vec<_>>().join(" ");
    Some(Topic { id, text })
}

pub fn read_topics<R: BufRead>(reader: R) -> std::io::Result<Vec<Topic>> {
    let mut topics = Vec::new();
    for line in reader.lines() {
        if let Some(topic) = parse_topic_line(&line?) {
            topics.push(topic);
        }
    }
    Ok(topics)
}

/// One line of a run file: `<query_id> Q0 <document_id> <rank> <score> <tag>`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLine<'a> {
    pub query_id: &'a str,
    pub doc_id: &'a str,
    pub rank: usize,
    pub score: f64,
    pub tag: &'a str,
}

impl fmt::Display for RunLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Q0 {} {} {} {}", self.query_id, self.doc_id, self.rank, self.score, self.tag)
    }
}

/// Write one ranked result list, ranks starting at 0.
pub fn write_run<W: Write>(out: &mut W, query_id: &str, ranked: &[(DocId, f64)], tag: &str) -> std::io::Result<()> {
    for (rank, (doc_id, score)) in ranked.iter().enumerate() {
        writeln!(out, "{}", RunLine { query_id, doc_id, rank, score: *score, tag })?;
    }
    Ok(())
}

//! Named timestamps and the intervals measured between them.
//!
//! A [`TimingSession`] is owned by whoever drives a benchmark pass and is
//! passed down explicitly, so two passes never share label space unless
//! they share a session.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Measure {
    pub name: String,
    pub duration: Duration,
}

impl Measure {
    pub fn duration_millis(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

#[derive(Debug, Default)]
pub struct TimingSession {
    marks: HashMap<String, Instant>,
    measures: Vec<Measure>,
}

impl TimingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current instant under `name`. Labels are write-once.
    pub fn mark(&mut self, name: &str) -> Result<(), TimingError> {
        if self.marks.contains_key(name) {
            return Err(TimingError::DuplicateMark(name.to_string()));
        }
        self.marks.insert(name.to_string(), Instant::now());
        Ok(())
    }

    /// Derives the interval between two existing marks and stores it as `name`.
    pub fn measure(
        &mut self,
        name: &str,
        start_mark: &str,
        end_mark: &str,
    ) -> Result<&Measure, TimingError> {
        if self.entry_by_name(name).is_some() {
            return Err(TimingError::DuplicateMeasure(name.to_string()));
        }
        let start = self.instant_of(start_mark)?;
        let end = self.instant_of(end_mark)?;

        self.measures.push(Measure {
            name: name.to_string(),
            duration: end.saturating_duration_since(start),
        });
        let index = self.measures.len() - 1;
        Ok(&self.measures[index])
    }

    pub fn entry_by_name(&self, name: &str) -> Option<&Measure> {
        self.measures.iter().find(|measure| measure.name == name)
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn clear_marks(&mut self) {
        self.marks.clear();
    }

    pub fn clear_measures(&mut self) {
        self.measures.clear();
    }

    fn instant_of(&self, mark: &str) -> Result<Instant, TimingError> {
        self.marks
            .get(mark)
            .copied()
            .ok_or_else(|| TimingError::UnknownMark(mark.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum TimingError {
    #[error("mark `{0}` already exists in this session")]
    DuplicateMark(String),
    #[error("measure `{0}` already exists in this session")]
    DuplicateMeasure(String),
    #[error("no mark named `{0}`")]
    UnknownMark(String),
}

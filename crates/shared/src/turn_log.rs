use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::models::Turn;

pub const PERSISTED_TURN_CAP: usize = 50;
pub const CHAT_CONTEXT_WINDOW: usize = 10;
pub const SEARCH_CONTEXT_WINDOW: usize = 3;

#[derive(Debug, Clone)]
pub struct TurnLog {
    turns: VecDeque<Turn>,
    cap: usize,
}

impl TurnLog {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            cap,
        }
    }

    pub fn from_turns(turns: Vec<Turn>, cap: usize) -> Self {
        let mut log = Self::with_cap(cap);
        for turn in turns {
            log.push(turn);
        }
        log
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.cap {
            self.turns.pop_front();
        }
    }

    // Most recent `window` turns, oldest first.
    pub fn recent(&self, window: usize) -> Vec<Turn> {
        let skip = self.turns.len().saturating_sub(window);
        self.turns.iter().skip(skip).cloned().collect()
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[derive(Debug, Clone)]
pub struct TurnLogStore {
    path: PathBuf,
}

impl TurnLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Missing file reads as an empty history; a corrupt file is treated the
    // same so a half-written log from a crashed process cannot wedge startup.
    pub fn load(&self) -> io::Result<Vec<Turn>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.save(&[])?;
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        match serde_json::from_str::<Vec<Turn>>(&raw) {
            Ok(turns) => Ok(turns),
            Err(err) => {
                warn!(path = %self.path.display(), "discarding unreadable chat log: {err}");
                Ok(Vec::new())
            }
        }
    }

    // Atomic replace: serialize to a sibling temp file, then rename over the
    // target so readers never observe a partial write.
    pub fn save(&self, turns: &[Turn]) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let skip = turns.len().saturating_sub(PERSISTED_TURN_CAP);
        let window = &turns[skip..];
        let json = serde_json::to_string_pretty(window)?;

        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &self.path)?;
        debug!(
            path = %self.path.display(),
            turns = window.len(),
            "chat log saved"
        );
        Ok(())
    }
}

use crate::ChatTurn;
use dashmap::DashMap;

pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, Default)]
pub struct ChatHistoryStore {
    sessions: DashMap<String, Vec<ChatTurn>>,
}

impl ChatHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, session: &str, turn: ChatTurn) -> Vec<ChatTurn> {
        let mut entry = self.sessions.entry(session.to_string()).or_default();
        entry.push(turn);
        entry.value().clone()
    }

    pub fn history(&self, session: &str) -> Vec<ChatTurn> {
        self.sessions
            .get(session)
            .map(|turns| turns.value().clone())
            .unwrap_or_default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

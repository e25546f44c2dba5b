use crate::retriever::{Retriever, DEFAULT_TOP_K};
use crate::traits::{ChatModel, Embedder, QuestionAnswerer, VectorIndex};
use crate::{ChatMessage, ChatTurn, SearchHit, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

pub const SYSTEM_PERSONA: &str = "You are Elective Genie, a friendly assistant that helps students \
choose elective courses. Answer only from the course context below. If the context does not \
contain the answer, say that you don't know.";

const STUFF_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    #[default]
    Stuff,
    Persona,
}

impl FromStr for AnswerMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "stuff" => Ok(Self::Stuff),
            "persona" => Ok(Self::Persona),
            other => Err(format!("unknown answer mode '{other}', expected 'stuff' or 'persona'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchHit>,
}

pub struct Answerer<E, V, C> {
    retriever: Retriever<E, V>,
    chat: C,
    mode: AnswerMode,
    top_k: usize,
}

impl<E, V, C> Answerer<E, V, C>
where
    E: Embedder,
    V: VectorIndex,
    C: ChatModel,
{
    pub fn new(retriever: Retriever<E, V>, chat: C) -> Self {
        Self {
            retriever,
            chat,
            mode: AnswerMode::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_mode(mut self, mode: AnswerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn retriever(&self) -> &Retriever<E, V> {
        &self.retriever
    }

    pub async fn answer(&self, question: &str, history: &[ChatTurn]) -> Result<Answer, ServiceError> {
        let sources = self.retriever.similarity_search(question, self.top_k).await?;
        let context = build_context(&sources);
        let messages = build_messages(self.mode, &context, question, history);

        let text = self.chat.complete(&messages).await?;
        info!(
            mode = ?self.mode,
            sources = sources.len(),
            answer_len = text.len(),
            "answered question"
        );

        Ok(Answer { text, sources })
    }
}

#[async_trait]
impl<E, V, C> QuestionAnswerer for Answerer<E, V, C>
where
    E: Embedder,
    V: VectorIndex,
    C: ChatModel,
{
    async fn answer_question(
        &self,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<String, ServiceError> {
        Ok(self.answer(question, history).await?.text)
    }
}

pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_messages(
    mode: AnswerMode,
    context: &str,
    question: &str,
    history: &[ChatTurn],
) -> Vec<ChatMessage> {
    match mode {
        AnswerMode::Stuff => vec![ChatMessage::user(format!(
            "{STUFF_PREAMBLE}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:"
        ))],
        AnswerMode::Persona => {
            let mut messages = Vec::with_capacity(history.len() * 2 + 2);
            messages.push(ChatMessage::system(format!(
                "{SYSTEM_PERSONA}\n\nContext:\n{context}"
            )));
            for turn in history {
                messages.push(ChatMessage::user(turn.user.clone()));
                messages.push(ChatMessage::assistant(turn.bot.clone()));
            }
            messages.push(ChatMessage::user(question));
            messages
        }
    }
}

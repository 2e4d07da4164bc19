use tracing::{debug, info};

use super::persona::{
    MAX_CONTEXT_DOCS, build_context, detect_tone, persona_prompt, truncate_context, user_prompt,
};
use crate::errors::{BookingError, BookingResult};
use crate::ports::{ChatModel, KnowledgeSearch};

pub const NO_CONTEXT_REPLY: &str = "Unfortunately I could not find any matching information. \
     Feel free to ask me about our services or the website!";

/// Name and site the assistant introduces itself with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assistant {
    pub name: String,
    pub site: String,
}

impl Default for Assistant {
    fn default() -> Self {
        Self {
            name: "LandKI".to_string(),
            site: "it-land.net".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeAnswer {
    pub text: String,
    /// False when the fixed no-context reply was used.
    pub from_model: bool,
}

/// Answers a question from the search index through the language model.
pub async fn answer(
    search: &dyn KnowledgeSearch,
    model: &dyn ChatModel,
    assistant: &Assistant,
    question: &str,
) -> BookingResult<KnowledgeAnswer> {
    let question = question.trim();
    if question.is_empty() {
        return Err(BookingError::Validation("No question received".to_string()));
    }

    let tone = detect_tone(question);
    debug!("Answering with tone {:?}", tone);

    let documents = search.search(question, MAX_CONTEXT_DOCS * 2).await?;
    let context = build_context(documents);
    if context.is_empty() {
        info!("No search context for question, using fallback reply");
        return Ok(KnowledgeAnswer {
            text: NO_CONTEXT_REPLY.to_string(),
            from_model: false,
        });
    }

    let system = persona_prompt(tone, &assistant.name, &assistant.site);
    let user = user_prompt(truncate_context(&context), question);
    let text = model.complete(&system, &user).await?.trim().to_string();

    Ok(KnowledgeAnswer {
        text,
        from_model: true,
    })
}

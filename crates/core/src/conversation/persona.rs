//! Tone detection and prompt assembly for knowledge answers.

/// How the assistant addresses the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// German informal address ("du")
    Informal,
    /// German formal address ("Sie")
    Formal,
    /// Any other language
    Neutral,
}

/// Documents taken from the search index per question.
pub const MAX_CONTEXT_DOCS: usize = 3;
/// Context longer than this is cut down to [`CONTEXT_CUT_CHARS`].
pub const CONTEXT_SOFT_LIMIT_CHARS: usize = 1500;
pub const CONTEXT_CUT_CHARS: usize = 1000;

const FORMAL_MARKERS: [&str; 5] = [
    " sie ",
    "ihnen",
    "ihr unternehmen",
    "was bieten sie",
    "kann ich sie",
];

const GERMAN_WORDS: [&str; 24] = [
    "der", "die", "das", "und", "ich", "ist", "nicht", "ein", "eine", "was", "wie", "wer",
    "sie", "du", "ihr", "ihnen", "mit", "für", "kann", "können", "bitte", "haben", "wir", "gibt",
];

/// Rough check whether a message is German, based on common words and umlauts.
pub fn is_probably_german(message: &str) -> bool {
    let lower = message.to_lowercase();
    if lower.contains(['ä', 'ö', 'ü', 'ß']) {
        return true;
    }
    let hits = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| GERMAN_WORDS.contains(word))
        .count();
    hits >= 2
}

pub fn detect_tone(message: &str) -> Tone {
    if !is_probably_german(message) {
        return Tone::Neutral;
    }
    let padded = format!(" {} ", message.to_lowercase());
    if FORMAL_MARKERS.iter().any(|marker| padded.contains(marker)) {
        Tone::Formal
    } else {
        Tone::Informal
    }
}

/// System prompt for the given tone. The indexed content is German, so the
/// model is told to answer in the language of the question.
pub fn persona_prompt(tone: Tone, name: &str, site: &str) -> String {
    let persona = match tone {
        Tone::Informal => format!(
            "Du bist {name}, der freundliche KI-Assistent von {site}. \
             Sprich den Nutzer in der Du-Form an. Antworte in seiner Sprache und auf Basis des bereitgestellten Kontexts. \
             Wenn du etwas nicht weißt, sag das offen und freundlich."
        ),
        Tone::Formal => format!(
            "Sie sind {name}, der freundliche KI-Assistent von {site}. \
             Sprechen Sie den Nutzer in der Sie-Form an. Antworten Sie in seiner Sprache und auf Basis des bereitgestellten Kontexts. \
             Wenn Sie etwas nicht wissen, sagen Sie das bitte offen und höflich."
        ),
        Tone::Neutral => format!(
            "Du bist {name}, der freundliche KI-Assistent von {site}. \
             Antworte bitte in der Sprache des Nutzers, aber verwende einen neutralen Ton. \
             Antworte professionell, freundlich und direkt. Wenn du etwas nicht weißt, sag das offen."
        ),
    };
    format!(
        "{persona} Der Kontext ist auf Deutsch; übersetze ihn bei Bedarf in die Sprache der Frage."
    )
}

/// Joins up to [`MAX_CONTEXT_DOCS`] non-empty documents with blank lines.
pub fn build_context<I, S>(documents: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parts: Vec<String> = documents
        .into_iter()
        .map(|doc| doc.as_ref().trim().to_string())
        .filter(|doc| !doc.is_empty())
        .take(MAX_CONTEXT_DOCS)
        .collect();
    parts.join("\n\n")
}

/// Cuts context above the soft limit down to [`CONTEXT_CUT_CHARS`] characters.
pub fn truncate_context(context: &str) -> &str {
    if context.chars().count() <= CONTEXT_SOFT_LIMIT_CHARS {
        return context;
    }
    match context.char_indices().nth(CONTEXT_CUT_CHARS) {
        Some((byte_index, _)) => &context[..byte_index],
        None => context,
    }
}

pub fn user_prompt(context: &str, question: &str) -> String {
    format!("Kontext:\n{}\n\nFrage:\n{}", context, question)
}

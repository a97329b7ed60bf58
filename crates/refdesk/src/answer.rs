//! Answer composition over retrieved documents.
//!
//! The composer turns a [`RetrievalOutcome`] into user-visible text: a
//! grounding prompt instructs the chat model to answer strictly from the
//! supplied context, and a deduplicated source list is appended to
//! whatever the model returns. Both refusal messages are fixed strings so
//! downstream layers (and tests) can match them exactly.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::chat::{ChatMessage, ChatModel, TokenUsage};
use crate::documents::{keys, Document};
use crate::error::Result;
use crate::retrieval::RetrievalOutcome;

/// Reply the model is instructed to return verbatim when the context
/// cannot answer the question. Also used when the model returns an empty
/// completion.
pub const INSUFFICIENT_CONTEXT_REPLY: &str =
    "Üzgünüm, bu konu hakkında belgemde yeterli bilgi bulunmuyor.";

/// Reply for a query that retrieved nothing; the model is never called.
#[must_use]
pub fn no_results_reply(query: &str) -> String {
    format!("Üzgünüm, \"{query}\" hakkında belgelerimde yeterli bilgi bulunamadı.")
}

/// Renders the grounding prompt sent to the chat model.
///
/// `context` is the retrieved documents' content joined by blank lines.
#[must_use]
pub fn grounding_prompt(context: &str, query: &str) -> String {
    format!(
        "Sen yardımcı bir kütüphane asistanısın. Görevin, SADECE BAĞLAM'daki bilgilere dayanarak yanıt vermektir.

KURALLAR:
- BAĞLAM dışında bilgi ekleme, tahmin yürütme veya genelleme yapma.
- Eğer BAĞLAM doğrudan yanıt içermiyorsa ama benzer veya ilgili bilgiler varsa, bunları \"İlgili bilgi:\" başlığı altında kullanıcıya aktar.
- BAĞLAM soruyu yanıtlamak için yeterli değilse şu cümleyi aynen döndür:
  \"{INSUFFICIENT_CONTEXT_REPLY}\"
- Yanıtı kullanıcının dilinde ver.
- BAĞLAM'da telefon numarası veya web sitesi varsa, bunları HTML <a> etiketiyle ver.
- Kaynakları en sonda madde madde göster (dosya adı + sayfa vb. varsa).

BAĞLAM:
{context}

SORU: {query}

YANIT:
"
    )
}

/// Caller-supplied hook observing composed answers. Purely
/// observational: a failing logger is reported at warn level and
/// otherwise ignored.
#[async_trait]
pub trait ChatLogger: Send + Sync {
    /// Called with the final answer text and the documents it was
    /// grounded on.
    async fn log_chat(&self, answer: &str, context: &[Document]) -> Result<()>;
}

/// A composed reply, ready to show to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedAnswer {
    /// Final text: the model's reply (or a refusal) plus the source
    /// block.
    pub text: String,
    /// Deduplicated citation labels, in retrieval order.
    pub sources: Vec<String>,
    /// Token usage, when the provider reports it.
    pub usage: Option<TokenUsage>,
}

/// Builds grounded answers from retrieval outcomes.
pub struct AnswerComposer {
    chat: Arc<dyn ChatModel>,
    logger: Option<Arc<dyn ChatLogger>>,
}

impl AnswerComposer {
    /// Creates a composer delegating to the given chat model.
    #[must_use]
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat, logger: None }
    }

    /// Attaches an observational logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn ChatLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Answers `query` from the retrieval outcome.
    ///
    /// `NoRelevantInformation` short-circuits to the fixed refusal
    /// without calling the model. Otherwise the model's reply (or
    /// [`INSUFFICIENT_CONTEXT_REPLY`] when the reply is blank) is
    /// returned with the citation block appended.
    pub async fn compose(&self, query: &str, outcome: &RetrievalOutcome) -> Result<ComposedAnswer> {
        let documents = match outcome {
            RetrievalOutcome::NoRelevantInformation => {
                return Ok(ComposedAnswer {
                    text: no_results_reply(query),
                    sources: Vec::new(),
                    usage: None,
                });
            }
            RetrievalOutcome::Found(documents) => documents,
        };

        let context: String = documents
            .iter()
            .map(|d| d.page_content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = grounding_prompt(&context, query);
        let response = self.chat.complete(&[ChatMessage::user(prompt)]).await?;

        let answer = response.content.trim();
        let answer = if answer.is_empty() {
            INSUFFICIENT_CONTEXT_REPLY.to_string()
        } else {
            answer.to_string()
        };

        let sources = citation_labels(documents);
        let text = format!("{answer}{}", sources_block(&sources));

        if let Some(logger) = &self.logger {
            if let Err(error) = logger.log_chat(&text, documents).await {
                warn!(%error, "chat logger failed");
            }
        }

        Ok(ComposedAnswer {
            text,
            sources,
            usage: response.usage,
        })
    }
}

/// Citation labels in retrieval order, first occurrence kept.
///
/// A label is the `source` metadata plus `p.{page}` when a page is
/// recorded, joined by `" - "`. Documents with neither are skipped.
fn citation_labels(documents: &[Document]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for doc in documents {
        let mut parts: Vec<String> = Vec::new();
        if let Some(source) = doc.source() {
            parts.push(source.to_string());
        }
        match doc.get_metadata(keys::PAGE) {
            Some(Value::Number(page)) => parts.push(format!("p.{page}")),
            Some(Value::String(page)) => parts.push(format!("p.{page}")),
            _ => {}
        }
        let label = parts.join(" - ");
        if !label.is_empty() && !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Renders the HTML source block, or an empty string without labels.
fn sources_block(labels: &[String]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let items: Vec<String> = labels.iter().map(|s| format!("<li>{s}</li>")).collect();
    format!(
        "\n\n<hr/>\n<b>Kaynaklar:</b>\n<ul>\n{}\n</ul>",
        items.join("\n")
    )
}

use crate::error::GatewayError;
use crate::history::ConversationContext;
use crate::image::NormalizedImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  User,
  Assistant,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::User => "user",
      Role::Assistant => "assistant",
    }
  }
}

#[derive(Debug, Clone)]
pub enum TurnContent {
  Text(String),
  // Prompt text plus an inline image, sent with a high-detail hint.
  TextWithImage {
    text: String,
    image: NormalizedImage,
  },
}

#[derive(Debug, Clone)]
pub struct Turn {
  pub role: Role,
  pub content: TurnContent,
}

// Provider-agnostic request shape: one system text, then turns ending
// in the current user turn. History rides inside the system text so the
// caller never re-transmits it per message.
#[derive(Debug, Clone)]
pub struct AssembledMessage {
  pub system_text: String,
  pub turns: Vec<Turn>,
}

impl AssembledMessage {
  pub fn has_image(&self) -> bool {
    self
      .turns
      .iter()
      .any(|turn| matches!(turn.content, TurnContent::TextWithImage { .. }))
  }
}

pub fn assemble(
  persona: &str,
  prompt: Option<&str>,
  image: Option<NormalizedImage>,
  context: &ConversationContext,
) -> Result<AssembledMessage, GatewayError> {
  let prompt = prompt
    .map(str::trim)
    .filter(|p| !p.is_empty())
    .ok_or(GatewayError::EmptyPrompt)?;

  let mut system_text = persona.to_string();
  if !context.is_empty() {
    system_text.push_str("\n\nConversation so far:\n");
    system_text.push_str(&context.render());
  }

  let content = match image {
    Some(image) => TurnContent::TextWithImage {
      text: prompt.to_string(),
      image,
    },
    None => TurnContent::Text(prompt.to_string()),
  };

  Ok(AssembledMessage {
    system_text,
    turns: vec![Turn {
      role: Role::User,
      content,
    }],
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::image::JPEG_MIME;
  use crate::models::{Exchange, Source};

  fn context_with(pairs: &[(&str, &str)]) -> ConversationContext {
    let exchanges = pairs
      .iter()
      .enumerate()
      .map(|(i, (prompt, response))| Exchange {
        id: format!("e{i}"),
        prompt: prompt.to_string(),
        image: None,
        response: response.to_string(),
        source: Source::Other,
        created_at: format!("2026-01-01T00:00:0{i}Z"),
      })
      .collect();
    ConversationContext { exchanges }
  }

  fn test_image() -> NormalizedImage {
    NormalizedImage {
      bytes: vec![0xFF, 0xD8],
      mime: JPEG_MIME.to_string(),
      quality: 85,
    }
  }

  #[test]
  fn empty_prompt_short_circuits() {
    let context = ConversationContext::default();
    assert!(matches!(
      assemble("persona", None, None, &context),
      Err(GatewayError::EmptyPrompt)
    ));
    assert!(matches!(
      assemble("persona", Some(""), None, &context),
      Err(GatewayError::EmptyPrompt)
    ));
    assert!(matches!(
      assemble("persona", Some("   "), Some(test_image()), &context),
      Err(GatewayError::EmptyPrompt)
    ));
  }

  #[test]
  fn text_only_request_has_system_plus_one_user_turn() {
    let context = ConversationContext::default();
    let message = assemble("persona", Some("Hello"), None, &context).unwrap();
    assert_eq!(message.system_text, "persona");
    assert_eq!(message.turns.len(), 1);
    assert_eq!(message.turns[0].role, Role::User);
    assert!(matches!(&message.turns[0].content, TurnContent::Text(t) if t == "Hello"));
    assert!(!message.has_image());
  }

  #[test]
  fn history_is_embedded_in_system_text() {
    let context = context_with(&[("hi", "hello"), ("how are you", "fine")]);
    let message = assemble("persona", Some("and now?"), None, &context).unwrap();
    assert!(message.system_text.starts_with("persona"));
    assert!(message.system_text.contains("Conversation so far:"));
    assert!(message.system_text.contains("User: hi\nAssistant: hello\n"));
    assert!(message
      .system_text
      .contains("User: how are you\nAssistant: fine\n"));
    // History rides in the system text; the turn list stays just the
    // current request.
    assert_eq!(message.turns.len(), 1);
  }

  #[test]
  fn image_request_pairs_text_with_image() {
    let context = ConversationContext::default();
    let message = assemble("persona", Some("what is this"), Some(test_image()), &context).unwrap();
    assert!(message.has_image());
    match &message.turns[0].content {
      TurnContent::TextWithImage { text, image } => {
        assert_eq!(text, "what is this");
        assert_eq!(image.mime, JPEG_MIME);
      }
      other => panic!("unexpected content: {other:?}"),
    }
  }

  #[test]
  fn prompt_whitespace_is_trimmed() {
    let context = ConversationContext::default();
    let message = assemble("persona", Some("  Hello  "), None, &context).unwrap();
    assert!(matches!(&message.turns[0].content, TurnContent::Text(t) if t == "Hello"));
  }
}

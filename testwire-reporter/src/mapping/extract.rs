// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::host::{Annotation, HostAttachment, TestError};
use itertools::Itertools;
use testwire_metadata::{Attachment, AttachmentContent, Metadata};

/// Errors of a test execution, flattened for the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedErrors {
    /// Every message, newline-joined.
    pub message: String,
    /// Every stack trace, newline-joined.
    pub stack_trace: String,
    /// The individual messages.
    pub messages: Vec<String>,
}

/// Flattens a list of host errors.
///
/// Missing messages and stacks become empty strings; they are kept in the joined output so that
/// line `i` of the message always corresponds to error `i`.
pub fn extract_errors(errors: &[TestError]) -> ExtractedErrors {
    let messages: Vec<String> = errors
        .iter()
        .map(|error| error.message.clone().unwrap_or_default())
        .collect();
    let stack_trace = errors
        .iter()
        .map(|error| error.stack.as_deref().unwrap_or_default())
        .join("\n");

    ExtractedErrors {
        message: messages.join("\n"),
        stack_trace,
        messages,
    }
}

/// Converts a host attachment.
///
/// A path takes priority over an in-memory body. An attachment with neither is still converted,
/// with no content.
pub fn extract_attachment(attachment: &HostAttachment) -> Attachment {
    let content = match (&attachment.path, &attachment.body) {
        (Some(path), _) => Some(AttachmentContent::Uri(path.clone())),
        (None, Some(body)) => Some(AttachmentContent::Inline(body.clone())),
        (None, None) => None,
    };

    Attachment {
        name: attachment.name.clone(),
        mime_type: attachment.content_type.clone(),
        content,
    }
}

/// Converts every attachment of a result.
pub fn extract_attachments(attachments: &[HostAttachment]) -> Vec<Attachment> {
    attachments.iter().map(extract_attachment).collect()
}

/// Adds `{prefix}_{i}_type` and, where present, `{prefix}_{i}_description` for each annotation.
pub fn add_annotation_metadata(metadata: &mut Metadata, prefix: &str, annotations: &[Annotation]) {
    for (i, annotation) in annotations.iter().enumerate() {
        metadata.insert(format!("{prefix}_{i}_type"), annotation.kind.clone());
        if let Some(description) = &annotation.description {
            metadata.insert(format!("{prefix}_{i}_description"), description.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn error(message: Option<&str>, stack: Option<&str>) -> TestError {
        TestError {
            message: message.map(str::to_owned),
            stack: stack.map(str::to_owned),
        }
    }

    #[test]
    fn errors_are_joined() {
        let extracted = extract_errors(&[error(Some("a"), None), error(Some("b"), Some("at b"))]);
        assert_eq!(
            extracted,
            ExtractedErrors {
                message: "a\nb".to_owned(),
                stack_trace: "\nat b".to_owned(),
                messages: vec!["a".to_owned(), "b".to_owned()],
            }
        );
    }

    #[test]
    fn missing_messages_become_empty_strings() {
        let extracted = extract_errors(&[error(None, None), error(Some("b"), None)]);
        assert_eq!(extracted.message, "\nb");
        assert_eq!(extracted.messages, ["", "b"]);
    }

    #[test]
    fn no_errors() {
        assert_eq!(extract_errors(&[]), ExtractedErrors::default());
    }

    #[test]
    fn attachment_path_becomes_uri() {
        let attachment = extract_attachment(&HostAttachment {
            name: "screenshot".to_owned(),
            content_type: "image/png".to_owned(),
            path: Some("/x.png".to_owned()),
            body: Some(Bytes::from_static(b"ignored")),
        });
        assert_eq!(attachment.uri(), Some("/x.png"));
        assert_eq!(attachment.inline(), None);
    }

    #[test]
    fn attachment_body_is_inlined() {
        let body = Bytes::from_static(b"\x89PNG");
        let attachment = extract_attachment(&HostAttachment {
            name: "screenshot".to_owned(),
            content_type: "image/png".to_owned(),
            path: None,
            body: Some(body.clone()),
        });
        assert_eq!(attachment.inline(), Some(&body));
        assert_eq!(attachment.uri(), None);
    }

    #[test]
    fn attachment_without_content_is_kept() {
        let attachments = extract_attachments(&[HostAttachment {
            name: "empty".to_owned(),
            content_type: "text/plain".to_owned(),
            path: None,
            body: None,
        }]);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].content, None);
    }

    #[test]
    fn annotation_keys() {
        let mut metadata = Metadata::new();
        add_annotation_metadata(
            &mut metadata,
            "annotation",
            &[
                Annotation {
                    kind: "issue".to_owned(),
                    description: Some("#123".to_owned()),
                },
                Annotation {
                    kind: "slow".to_owned(),
                    description: None,
                },
            ],
        );
        let keys: Vec<_> = metadata.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["annotation_0_type", "annotation_0_description", "annotation_1_type"]
        );
        assert_eq!(metadata["annotation_0_description"], "#123");
    }
}

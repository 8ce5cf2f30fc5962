// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    CollectorMethod, DecodeError, Duration, EncodeError, SuiteType, TestStatus, Timestamp,
};
use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Free-form string metadata attached to suites, tests and steps.
///
/// Insertion order is preserved on the wire.
pub type Metadata = IndexMap<String, String>;

/// A message that can be sent to the collector as the payload of a unary call.
pub trait WireMessage: std::fmt::Debug + Send + Sync + 'static {
    /// The collector method this message is sent to.
    const METHOD: CollectorMethod;

    /// Encodes this message into its wire payload.
    ///
    /// Messages without a serializer of their own are sent with an empty payload.
    fn encode(&self) -> Result<Bytes, EncodeError> {
        Ok(Bytes::new())
    }
}

macro_rules! impl_wire_message {
    ($($ty:ty => $method:ident,)*) => {
        $(
            impl WireMessage for $ty {
                const METHOD: CollectorMethod = CollectorMethod::$method;

                fn encode(&self) -> Result<Bytes, EncodeError> {
                    serde_json::to_vec(self)
                        .map(Bytes::from)
                        .map_err(|err| EncodeError::new(Self::METHOD, err))
                }
            }
        )*

        /// A decoded request, as received by a collector.
        #[derive(Clone, Debug, PartialEq, Serialize)]
        #[serde(untagged)]
        pub enum CollectorRequest {
            $(
                #[allow(missing_docs)]
                $method($ty),
            )*
        }

        impl CollectorRequest {
            /// Decodes the payload of a call to `method`.
            pub fn decode(method: CollectorMethod, payload: &[u8]) -> Result<Self, DecodeError> {
                match method {
                    $(
                        CollectorMethod::$method => serde_json::from_slice(payload)
                            .map(Self::$method)
                            .map_err(|err| DecodeError::new(method, err)),
                    )*
                }
            }

            /// Returns the method this request was sent to.
            pub fn method(&self) -> CollectorMethod {
                match self {
                    $(Self::$method(_) => CollectorMethod::$method,)*
                }
            }
        }
    };
}

impl_wire_message! {
    MapTestRunEventRequest => MapTestRun,
    SuiteBeginEventRequest => ReportSuiteBegin,
    SuiteEndEventRequest => ReportSuiteEnd,
    TestBeginEventRequest => ReportTestBegin,
    TestEndEventRequest => ReportTestEnd,
    TestFailureEventRequest => ReportTestFailure,
    StepBeginEventRequest => ReportStepBegin,
    StepEndEventRequest => ReportStepEnd,
    TestRunEndEventRequest => ReportRunEnd,
    StdErrorEventRequest => ReportStdError,
}

/// Where the content of an [`Attachment`] lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentContent {
    /// A reference to content stored outside the message, such as a file path.
    Uri(String),
    /// Content embedded in the message.
    Inline(Bytes),
}

/// A file or blob produced by a test, such as a screenshot or a trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// The attachment name.
    pub name: String,
    /// The MIME type of the content.
    pub mime_type: String,
    /// The content location. `None` if the host supplied neither a path nor a body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<AttachmentContent>,
}

impl Attachment {
    /// Returns the URI of the content, if it is stored externally.
    pub fn uri(&self) -> Option<&str> {
        match &self.content {
            Some(AttachmentContent::Uri(uri)) => Some(uri),
            _ => None,
        }
    }

    /// Returns the inline content, if it is embedded.
    pub fn inline(&self) -> Option<&Bytes> {
        match &self.content {
            Some(AttachmentContent::Inline(body)) => Some(body),
            _ => None,
        }
    }
}

/// A test case as listed in a suite map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseSummary {
    /// The host-assigned test id.
    pub id: String,
    /// The test title.
    pub name: String,
}

/// A suite within a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSuiteRun {
    /// The derived suite id.
    pub id: String,
    /// The suite title, or `root` for the root suite.
    pub name: String,
    /// The run this suite belongs to.
    pub run_id: String,
    /// The id of the parent suite. `None` for the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_suite_id: Option<String>,
    /// The kind of suite.
    #[serde(rename = "type")]
    pub suite_type: SuiteType,
    /// `file:line:column`, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// When the suite started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    /// When the suite finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    /// How long the suite took.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    /// The suite status.
    pub status: TestStatus,
    /// Additional metadata.
    pub metadata: Metadata,
    /// The tests directly owned by this suite.
    pub test_cases: Vec<TestCaseSummary>,
}

/// One execution of a test case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCaseRun {
    /// The host-assigned test id, stable across retries.
    pub id: String,
    /// The test title.
    pub name: String,
    /// The run this test belongs to.
    pub run_id: String,
    /// The id of the owning suite.
    pub suite_id: String,
    /// The test status.
    pub status: TestStatus,
    /// When this execution started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    /// How long this execution took.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    /// Tags declared on the test.
    pub tags: Vec<String>,
    /// Annotations, flattened into `annotation_{i}_*` and `result_annotation_{i}_*` keys.
    pub metadata: Metadata,
    /// `file:line:column`, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// The zero-based retry index of this execution.
    pub retry_index: u32,
    /// The number of retries configured for the test.
    pub retry_count: u32,
    /// The host worker that ran this execution.
    pub worker_index: i64,
    /// Attachments produced by this execution.
    pub attachments: Vec<Attachment>,
    /// All error messages, newline-joined.
    pub error_message: String,
    /// All stack traces, newline-joined.
    pub stack_trace: String,
    /// The individual error messages.
    pub errors: Vec<String>,
}

/// One execution of a step within a test.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepRun {
    /// The derived step id.
    pub id: String,
    /// The run this step belongs to.
    pub run_id: String,
    /// The id of the test this step belongs to.
    pub test_case_id: String,
    /// The id of the enclosing step, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_step_id: Option<String>,
    /// The step title.
    pub title: String,
    /// The host's step category, e.g. `test.step` or `expect`.
    pub category: String,
    /// The step status.
    pub status: TestStatus,
    /// When the step started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    /// How long the step took. Only present once the step has finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    /// The error message, or empty if the step passed.
    pub error: String,
    /// The individual error messages.
    pub errors: Vec<String>,
    /// `file:line:column`, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// The step category and annotations.
    pub metadata: Metadata,
    /// The host worker that ran the step.
    pub worker_index: i64,
}

/// Sent once at the beginning of a run with the full suite tree, flattened in pre-order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapTestRunEventRequest {
    /// The run id.
    pub run_id: String,
    /// When the run started.
    pub start_time: Timestamp,
    /// The number of tests in the run.
    pub total_tests: u64,
    /// Run configuration, such as the worker count.
    pub metadata: Metadata,
    /// Every suite in the tree; parents always precede their children.
    pub suites: Vec<TestSuiteRun>,
}

/// A suite started.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteBeginEventRequest {
    /// The suite.
    pub suite: TestSuiteRun,
}

/// A suite finished.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteEndEventRequest {
    /// The suite, with its end time, duration and status.
    pub suite: TestSuiteRun,
}

/// A test started.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestBeginEventRequest {
    /// The test execution.
    pub test_case: TestCaseRun,
}

/// A test finished.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEndEventRequest {
    /// The test execution, with status, errors and attachments.
    pub test_case: TestCaseRun,
}

/// A test failed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestFailureEventRequest {
    /// The host-assigned test id.
    pub test_id: String,
    /// The run id.
    pub run_id: String,
    /// All error messages, newline-joined.
    pub failure_message: String,
    /// All stack traces, newline-joined.
    pub stack_trace: String,
    /// When the failure was observed.
    pub timestamp: Timestamp,
    /// Attachments produced by the failing execution.
    pub attachments: Vec<Attachment>,
}

/// A step started.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepBeginEventRequest {
    /// The step.
    pub step: StepRun,
}

/// A step finished.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEndEventRequest {
    /// The step, with duration and status.
    pub step: StepRun,
}

/// The run finished.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRunEndEventRequest {
    /// The run id.
    pub run_id: String,
    /// The final status of the run.
    pub final_status: TestStatus,
    /// When the run started.
    pub start_time: Timestamp,
    /// How long the run took.
    pub duration: Duration,
}

/// What produced a [`StdErrorEventRequest`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdErrorKind {
    /// An error reported by the host outside of any test.
    #[default]
    Error,
    /// A chunk written to standard error.
    Stderr,
}

/// A host error, or a chunk of standard error output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StdErrorEventRequest {
    /// The run id.
    pub run_id: String,
    /// What produced this message.
    pub kind: StdErrorKind,
    /// The error message or output chunk.
    pub message: String,
    /// The stack trace, if any.
    pub stack_trace: String,
    /// The test that produced the output, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    /// When the message was observed.
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A message that relies on the default encoding.
    #[derive(Debug)]
    struct Ping;

    impl WireMessage for Ping {
        const METHOD: CollectorMethod = CollectorMethod::ReportStdError;
    }

    #[test]
    fn messages_without_a_serializer_encode_empty() {
        assert_eq!(Ping.encode().unwrap(), Bytes::new());

        let serialized = StdErrorEventRequest::default().encode().unwrap();
        assert!(!serialized.is_empty(), "request types use their own serializer");
    }

    #[test]
    fn attachment_content_is_exclusive() {
        let by_uri = Attachment {
            name: "screenshot".to_owned(),
            mime_type: "image/png".to_owned(),
            content: Some(AttachmentContent::Uri("/x.png".to_owned())),
        };
        assert_eq!(by_uri.uri(), Some("/x.png"));
        assert_eq!(by_uri.inline(), None);

        let json = serde_json::to_value(&by_uri).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "screenshot",
                "mime_type": "image/png",
                "content": { "uri": "/x.png" },
            })
        );

        let empty = Attachment {
            name: "nothing".to_owned(),
            mime_type: "text/plain".to_owned(),
            content: None,
        };
        assert!(
            serde_json::to_value(&empty)
                .unwrap()
                .get("content")
                .is_none()
        );
    }

    #[test]
    fn decode_dispatches_on_method() {
        let request = TestRunEndEventRequest {
            run_id: "run-1".to_owned(),
            final_status: TestStatus::Failed,
            start_time: Timestamp {
                seconds: 10,
                nanos: 5,
            },
            duration: Duration {
                seconds: 1,
                nanos: 0,
            },
        };
        let payload = request.encode().unwrap();

        let decoded = CollectorRequest::decode(CollectorMethod::ReportRunEnd, &payload).unwrap();
        assert_eq!(decoded.method(), CollectorMethod::ReportRunEnd);
        assert_eq!(decoded, CollectorRequest::ReportRunEnd(request));

        CollectorRequest::decode(CollectorMethod::ReportRunEnd, b"not json")
            .expect_err("garbage payload fails to decode");
    }

    #[test]
    fn metadata_preserves_insertion_order() {
        let mut suite = TestSuiteRun::default();
        suite.metadata.insert("zeta".to_owned(), "1".to_owned());
        suite.metadata.insert("alpha".to_owned(), "2".to_owned());

        let json = String::from_utf8(
            SuiteBeginEventRequest { suite }.encode().unwrap().to_vec(),
        )
        .unwrap();
        let zeta = json.find("zeta").unwrap();
        let alpha = json.find("alpha").unwrap();
        assert!(zeta < alpha, "metadata order preserved in {json}");
    }
}

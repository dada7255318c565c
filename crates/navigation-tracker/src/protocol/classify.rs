// Event classifier
//
// Pure mapping from a raw progress signal to a semantic verdict. The state
// machine applies verdicts; this module never mutates anything, which keeps
// the overlapping edge cases (initial document reloads, error pages,
// same-document changes, aborted initial loads) testable in isolation.

use crate::protocol::progress::{DocumentSnapshot, LocationChange, LocationFlags, StateChange};
use crate::protocol::status::Status;
use url::Url;

/// Name reported for an error page whose reason cannot be determined.
pub const GENERIC_ERROR_PAGE_NAME: &str = "Address rejected";

/// Query parameter of an error page location that carries the failure reason.
const ERROR_PAGE_REASON_PARAM: &str = "e";

/// Semantic interpretation of a progress signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing relevant to the tracked navigation
    NoOp,
    /// The navigation started; carries the request's original URI if known
    Started { target_uri: Option<Url> },
    /// A real document finished loading
    SucceededFinal,
    /// The initial blank document finished loading; a real navigation may follow
    SucceededAwaitingFurtherNav,
    /// The load failed and no error page will follow
    FailedImmediate { error_name: String },
    /// The load failed and an error page is being loaded in its place
    FailedAwaitingErrorPage { error_name: String },
    /// Load of the initial document was aborted, typically replaced by a real navigation
    AbortedInitialDocument,
    /// The error page committed
    ErrorPageConfirmed { error_name: String },
    /// Same-document navigation to a fragment
    FragmentNavigated { location: Url },
    /// Same-document navigation without a fragment (history API)
    SameDocumentNavigated { location: Url },
}

/// Classifies a state-change notification.
///
/// `seen_start` is whether the tracked navigation already started.
/// `success_statuses` lists failure codes the engine uses for loads that did
/// in fact complete (e.g. documents restored from the back-forward cache).
///
/// A notification carrying both the start and stop flags before the start was
/// seen classifies as [`Verdict::Started`]; the stop half is dropped.
pub fn classify_state_change(
    change: &StateChange,
    document: &DocumentSnapshot,
    seen_start: bool,
    success_statuses: &[Status],
) -> Verdict {
    if change.flags.is_start() && !seen_start {
        let target_uri = change.request.as_ref().and_then(|r| r.target_uri());
        return Verdict::Started { target_uri };
    }

    if !(change.flags.is_stop() && seen_start) {
        return Verdict::NoOp;
    }

    let status = change.status;
    if !status.is_success() && !success_statuses.contains(&status) {
        let error_name = status.name().into_owned();

        if document.load_type.is_error_page() {
            return Verdict::FailedAwaitingErrorPage { error_name };
        }

        if status == Status::NS_BINDING_ABORTED && document.is_initial_document {
            return Verdict::AbortedInitialDocument;
        }

        return Verdict::FailedImmediate { error_name };
    }

    if document.is_initial_document {
        Verdict::SucceededAwaitingFurtherNav
    } else {
        Verdict::SucceededFinal
    }
}

/// Classifies a location-change notification.
///
/// `pending_error_name` is the failure recorded by a preceding
/// [`Verdict::FailedAwaitingErrorPage`], which takes precedence over the
/// reason encoded in the error page location.
pub fn classify_location_change(
    change: &LocationChange,
    pending_error_name: Option<&str>,
) -> Verdict {
    if change.flags.contains(LocationFlags::ERROR_PAGE) {
        let error_name = pending_error_name
            .map(str::to_string)
            .or_else(|| error_page_reason(&change.location))
            .unwrap_or_else(|| GENERIC_ERROR_PAGE_NAME.to_string());
        return Verdict::ErrorPageConfirmed { error_name };
    }

    if change.flags.contains(LocationFlags::SAME_DOCUMENT) {
        let location = change.location.clone();
        return if location.fragment().is_some() {
            Verdict::FragmentNavigated { location }
        } else {
            Verdict::SameDocumentNavigated { location }
        };
    }

    Verdict::NoOp
}

/// Extracts the failure reason from an error page location,
/// e.g. `about:neterror?e=dnsNotFound&u=...` yields `dnsNotFound`.
pub fn error_page_reason(location: &Url) -> Option<String> {
    location
        .query_pairs()
        .find(|(key, _)| key == ERROR_PAGE_REASON_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::progress::{LoadType, RequestInfo, StateFlags};

    const DEFAULT_ALLOWLIST: &[Status] = &[Status::NS_ERROR_PARSED_DATA_CACHED];

    fn document(initial: bool) -> DocumentSnapshot {
        DocumentSnapshot {
            load_type: LoadType::CMD_NORMAL,
            is_initial_document: initial,
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn location(s: &str, flags: LocationFlags) -> LocationChange {
        LocationChange {
            location: url(s),
            flags,
        }
    }

    #[test]
    fn test_start_extracts_target_uri() {
        let change = StateChange::start(RequestInfo::new("https://example.com/next"));
        let verdict = classify_state_change(&change, &document(false), false, DEFAULT_ALLOWLIST);
        assert_eq!(
            verdict,
            Verdict::Started {
                target_uri: Some(url("https://example.com/next"))
            }
        );
    }

    #[test]
    fn test_start_without_channel_has_no_target() {
        let change = StateChange {
            request: None,
            flags: StateFlags::START,
            status: Status::OK,
        };
        let verdict = classify_state_change(&change, &document(false), false, DEFAULT_ALLOWLIST);
        assert_eq!(verdict, Verdict::Started { target_uri: None });
    }

    #[test]
    fn test_second_start_is_ignored() {
        let change = StateChange::start(RequestInfo::new("https://example.com/"));
        let verdict = classify_state_change(&change, &document(false), true, DEFAULT_ALLOWLIST);
        assert_eq!(verdict, Verdict::NoOp);
    }

    #[test]
    fn test_stop_before_start_is_ignored() {
        let change = StateChange::stop(Status::OK);
        let verdict = classify_state_change(&change, &document(false), false, DEFAULT_ALLOWLIST);
        assert_eq!(verdict, Verdict::NoOp);
    }

    #[test]
    fn test_successful_stop() {
        let change = StateChange::stop(Status::OK);
        assert_eq!(
            classify_state_change(&change, &document(false), true, DEFAULT_ALLOWLIST),
            Verdict::SucceededFinal
        );
        assert_eq!(
            classify_state_change(&change, &document(true), true, DEFAULT_ALLOWLIST),
            Verdict::SucceededAwaitingFurtherNav
        );
    }

    #[test]
    fn test_parsed_data_cached_counts_as_success() {
        let change = StateChange::stop(Status::NS_ERROR_PARSED_DATA_CACHED);
        assert_eq!(
            classify_state_change(&change, &document(false), true, DEFAULT_ALLOWLIST),
            Verdict::SucceededFinal
        );
        // Without the allowlist entry it is an ordinary failure
        assert_eq!(
            classify_state_change(&change, &document(false), true, &[]),
            Verdict::FailedImmediate {
                error_name: "NS_ERROR_PARSED_DATA_CACHED".to_string()
            }
        );
    }

    #[test]
    fn test_failed_stop_with_error_page_waits_for_location() {
        let change = StateChange::stop(Status::NS_BINDING_ABORTED);
        let doc = DocumentSnapshot {
            load_type: LoadType::ERROR_PAGE,
            is_initial_document: true,
        };
        // Error page takes precedence over the aborted-initial-document case
        assert_eq!(
            classify_state_change(&change, &doc, true, DEFAULT_ALLOWLIST),
            Verdict::FailedAwaitingErrorPage {
                error_name: "NS_BINDING_ABORTED".to_string()
            }
        );
    }

    #[test]
    fn test_aborted_initial_document_is_swallowed() {
        let change = StateChange::stop(Status::NS_BINDING_ABORTED);
        assert_eq!(
            classify_state_change(&change, &document(true), true, DEFAULT_ALLOWLIST),
            Verdict::AbortedInitialDocument
        );
        assert_eq!(
            classify_state_change(&change, &document(false), true, DEFAULT_ALLOWLIST),
            Verdict::FailedImmediate {
                error_name: "NS_BINDING_ABORTED".to_string()
            }
        );
    }

    #[test]
    fn test_other_failure_on_initial_document_fails() {
        let change = StateChange::stop(Status::NS_ERROR_UNKNOWN_HOST);
        assert_eq!(
            classify_state_change(&change, &document(true), true, DEFAULT_ALLOWLIST),
            Verdict::FailedImmediate {
                error_name: "NS_ERROR_UNKNOWN_HOST".to_string()
            }
        );
    }

    #[test]
    fn test_error_page_location_prefers_pending_name() {
        let change = location(
            "about:neterror?e=connectionFailure&u=http%3A//localhost%3A1/",
            LocationFlags::ERROR_PAGE,
        );
        assert_eq!(
            classify_location_change(&change, Some("NS_ERROR_CONNECTION_REFUSED")),
            Verdict::ErrorPageConfirmed {
                error_name: "NS_ERROR_CONNECTION_REFUSED".to_string()
            }
        );
        assert_eq!(
            classify_location_change(&change, None),
            Verdict::ErrorPageConfirmed {
                error_name: "connectionFailure".to_string()
            }
        );
    }

    #[test]
    fn test_error_page_location_falls_back_to_generic_name() {
        let change = location("about:neterror", LocationFlags::ERROR_PAGE);
        assert_eq!(
            classify_location_change(&change, None),
            Verdict::ErrorPageConfirmed {
                error_name: GENERIC_ERROR_PAGE_NAME.to_string()
            }
        );
    }

    #[test]
    fn test_same_document_changes() {
        let fragment = location("https://example.com/page#section", LocationFlags::SAME_DOCUMENT);
        assert_eq!(
            classify_location_change(&fragment, None),
            Verdict::FragmentNavigated {
                location: url("https://example.com/page#section")
            }
        );

        let push_state = location("https://example.com/other", LocationFlags::SAME_DOCUMENT);
        assert_eq!(
            classify_location_change(&push_state, None),
            Verdict::SameDocumentNavigated {
                location: url("https://example.com/other")
            }
        );
    }

    #[test]
    fn test_plain_location_change_is_ignored() {
        let change = location("https://example.com/", LocationFlags::default());
        assert_eq!(classify_location_change(&change, None), Verdict::NoOp);
        let reload = location("https://example.com/", LocationFlags::RELOAD);
        assert_eq!(classify_location_change(&reload, None), Verdict::NoOp);
    }
}

//! Publishes failed reconciles as `Warning` events on the reconciled object.

use std::error::Error;

use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::{
    controller,
    events::{Event, EventType, Recorder, Reporter},
};
use tracing::Instrument;

use super::controller::ReconcilerError;

/// Events are rejected by the API server if the note exceeds this many bytes.
const MAX_EVENT_NOTE_BYTES: usize = 1024;

const ELLIPSIS: char = '…';

/// The error and all of its sources, joined by `": "`.
fn error_chain(err: &dyn Error) -> String {
    let mut chain = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        chain.push_str(": ");
        chain.push_str(&source.to_string());
        current = source.source();
    }
    chain
}

/// Cuts `note` to at most `max_bytes`, ending it with an ellipsis if anything
/// was removed. Never splits a character.
fn truncate_note(note: &mut String, max_bytes: usize) {
    if note.len() <= max_bytes {
        return;
    }

    let Some(budget) = max_bytes.checked_sub(ELLIPSIS.len_utf8()) else {
        note.clear();
        return;
    };
    let cut = (0..=budget)
        .rev()
        .find(|&index| note.is_char_boundary(index))
        .unwrap_or_default();

    note.truncate(cut);
    note.push(ELLIPSIS);
}

fn error_to_event<E: ReconcilerError>(err: &E) -> Event {
    let mut note = error_chain(err);
    truncate_note(&mut note, MAX_EVENT_NOTE_BYTES);

    Event {
        type_: EventType::Warning,
        reason: err.category().to_owned(),
        note: Some(note),
        action: "Reconcile".to_owned(),
        secondary: err.secondary_object().map(Into::into),
    }
}

/// Publishes `controller_error` as an event if it belongs to a reconciled
/// object. Queue errors only concern the operator and are skipped.
///
/// The event is sent from a background task.
#[tracing::instrument(skip(client))]
pub fn publish_controller_error_as_k8s_event<ReconcileErr, QueueErr>(
    client: &kube::Client,
    controller: &str,
    controller_error: &controller::Error<ReconcileErr, QueueErr>,
) where
    ReconcileErr: ReconcilerError + 'static,
    QueueErr: Error + 'static,
{
    let controller::Error::ReconcilerFailed(error, object) = controller_error else {
        return;
    };

    let recorder = Recorder::new(
        client.clone(),
        Reporter {
            controller: controller.to_owned(),
            instance: None,
        },
    );
    let reference: ObjectReference = object.clone().into();
    let event = error_to_event(error);

    tokio::spawn(
        async move {
            if let Err(err) = recorder.publish(&event, &reference).await {
                tracing::error!(
                    error = &err as &dyn Error,
                    "failed to publish reconcile error as event"
                );
            }
        }
        .in_current_span(),
    );
}

//! Note list and editor.
//!
//! The local note list mirrors the server: it is replaced wholesale on
//! every fetch and never patched. Every mutation is followed by exactly
//! one re-fetch, whether or not the mutation succeeded.

use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiClient, NewNote, Note};
use crate::cancel::CancelToken;
use crate::notify::Notifier;

pub const NOTE_CREATED: &str = "Note created!";
pub const NOTE_CREATE_FAILED: &str = "Failed to make note.";
pub const NOTE_DELETED: &str = "Note deleted!";
pub const NOTE_DELETE_FAILED: &str = "Failed to delete note.";

/// Unsubmitted editor input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

/// Display form of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCard {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Creation date as `M/D/YYYY`
    pub date: String,
}

impl From<&Note> for NoteCard {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            title: note.title.clone(),
            content: note.content.clone(),
            date: note.created_at.format("%-m/%-d/%Y").to_string(),
        }
    }
}

pub struct NotesView {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    cancel: CancelToken,
    notes: Vec<Note>,
    pub draft: NoteDraft,
}

impl NotesView {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>, cancel: CancelToken) -> Self {
        Self {
            client,
            notifier,
            cancel,
            notes: Vec::new(),
            draft: NoteDraft::default(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn cards(&self) -> Vec<NoteCard> {
        self.notes.iter().map(NoteCard::from).collect()
    }

    pub async fn mount(&mut self) {
        self.fetch_notes().await;
    }

    /// Replace the local list with the server's.
    pub async fn fetch_notes(&mut self) {
        let fetched = self.cancel.run(self.client.list_notes()).await;
        match fetched {
            Ok(Ok(notes)) => {
                debug!("Fetched {} notes", notes.len());
                self.notes = notes;
            }
            Ok(Err(e)) => self.notifier.alert(&e.to_string()),
            Err(_) => debug!("Discarding note list for unmounted view"),
        }
    }

    pub async fn create_note(&mut self, title: &str, content: &str) {
        let note = NewNote {
            title: title.to_string(),
            content: content.to_string(),
        };
        let created = self.cancel.run(self.client.create_note(&note)).await;
        match created {
            Ok(Ok(response)) if response.status == 201 => self.notifier.alert(NOTE_CREATED),
            Ok(Ok(response)) => {
                debug!("Create note returned status {}", response.status);
                self.notifier.alert(NOTE_CREATE_FAILED);
            }
            Ok(Err(e)) => self.notifier.alert(&e.to_string()),
            Err(_) => return,
        }
        self.fetch_notes().await;
    }

    /// Submit the editor draft, clearing it.
    pub async fn submit_draft(&mut self) {
        let draft = std::mem::take(&mut self.draft);
        self.create_note(&draft.title, &draft.content).await;
    }

    pub async fn delete_note(&mut self, id: i64) {
        let deleted = self.cancel.run(self.client.delete_note(id)).await;
        match deleted {
            Ok(Ok(response)) if response.status == 204 => self.notifier.alert(NOTE_DELETED),
            Ok(Ok(response)) => {
                debug!("Delete note {} returned status {}", id, response.status);
                self.notifier.alert(NOTE_DELETE_FAILED);
            }
            Ok(Err(e)) => self.notifier.alert(&e.to_string()),
            Err(_) => return,
        }
        self.fetch_notes().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{NOTES_PATH, delete_note_path};
    use crate::notify::RecordingNotifier;
    use crate::token_store::TokenStore;
    use crate::transport::{HttpResponse, Method, MockTransport, TransportError};
    use serde_json::{Value, json};

    fn note_json(id: i64, title: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "content": format!("{title} body"),
            "created_at": "2024-03-09T15:04:05Z",
            "author": 1
        })
    }

    fn setup() -> (Arc<MockTransport>, Arc<RecordingNotifier>, NotesView) {
        let mock = Arc::new(MockTransport::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let client = ApiClient::new(mock.clone(), TokenStore::in_memory());
        let view = NotesView::new(client, notifier.clone(), CancelToken::never());
        (mock, notifier, view)
    }

    #[tokio::test]
    async fn test_mount_replaces_list() {
        let (mock, notifier, mut view) = setup();
        mock.reply(
            Method::Get,
            NOTES_PATH,
            Ok(HttpResponse::new(200, json!([note_json(3, "c"), note_json(1, "a")]))),
        );

        view.mount().await;

        assert_eq!(view.notes().iter().map(|n| n.id).collect::<Vec<_>>(), vec![3, 1]);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_alerts_and_keeps_previous() {
        let (mock, notifier, mut view) = setup();
        mock.reply(
            Method::Get,
            NOTES_PATH,
            Ok(HttpResponse::new(200, json!([note_json(1, "a")]))),
        );
        view.mount().await;

        mock.reply(Method::Get, NOTES_PATH, Ok(HttpResponse::empty(500)));
        view.fetch_notes().await;

        assert_eq!(view.notes().len(), 1);
        assert_eq!(
            notifier.messages(),
            vec!["Request failed with status code 500".to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_success_refetches_once() {
        let (mock, notifier, mut view) = setup();
        mock.reply(Method::Post, NOTES_PATH, Ok(HttpResponse::new(201, note_json(9, "new"))));
        mock.reply(
            Method::Get,
            NOTES_PATH,
            Ok(HttpResponse::new(200, json!([note_json(9, "new")]))),
        );

        view.create_note("new", "new body").await;

        assert_eq!(notifier.messages(), vec![NOTE_CREATED.to_string()]);
        assert_eq!(mock.call_count(Method::Get, NOTES_PATH), 1);
        assert_eq!(view.notes()[0].id, 9);
        assert_eq!(
            mock.calls()[0].body,
            Some(json!({ "title": "new", "content": "new body" }))
        );
    }

    #[tokio::test]
    async fn test_create_failure_still_refetches() {
        let (mock, notifier, mut view) = setup();
        mock.reply(Method::Post, NOTES_PATH, Ok(HttpResponse::new(400, json!({ "title": ["required"] }))));
        mock.reply(Method::Get, NOTES_PATH, Ok(HttpResponse::new(200, json!([]))));

        view.create_note("", "").await;

        assert_eq!(notifier.messages(), vec![NOTE_CREATE_FAILED.to_string()]);
        assert_eq!(mock.call_count(Method::Get, NOTES_PATH), 1);
    }

    #[tokio::test]
    async fn test_create_transport_error_still_refetches() {
        let (mock, notifier, mut view) = setup();
        mock.reply(
            Method::Post,
            NOTES_PATH,
            Err(TransportError::Network("connection refused".into())),
        );
        mock.reply(Method::Get, NOTES_PATH, Ok(HttpResponse::new(200, json!([]))));

        view.create_note("t", "c").await;

        assert_eq!(
            notifier.messages(),
            vec!["Network error: connection refused".to_string()]
        );
        assert_eq!(mock.call_count(Method::Get, NOTES_PATH), 1);
    }

    #[tokio::test]
    async fn test_delete_204_alerts_success_and_refetches() {
        let (mock, notifier, mut view) = setup();
        mock.reply(Method::Delete, &delete_note_path(5), Ok(HttpResponse::empty(204)));
        mock.reply(Method::Get, NOTES_PATH, Ok(HttpResponse::new(200, json!([]))));

        view.delete_note(5).await;

        assert_eq!(notifier.messages(), vec![NOTE_DELETED.to_string()]);
        assert_eq!(mock.call_count(Method::Get, NOTES_PATH), 1);
    }

    #[tokio::test]
    async fn test_delete_404_alerts_failure_and_refetches() {
        let (mock, notifier, mut view) = setup();
        mock.reply(
            Method::Delete,
            &delete_note_path(5),
            Ok(HttpResponse::new(404, json!({ "detail": "No Note matches the given query." }))),
        );
        mock.reply(
            Method::Get,
            NOTES_PATH,
            Ok(HttpResponse::new(200, json!([note_json(1, "a")]))),
        );

        view.delete_note(5).await;

        assert_eq!(notifier.messages(), vec![NOTE_DELETE_FAILED.to_string()]);
        assert_eq!(mock.call_count(Method::Get, NOTES_PATH), 1);
        assert_eq!(view.notes().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_draft_clears_form() {
        let (mock, _notifier, mut view) = setup();
        mock.reply(Method::Post, NOTES_PATH, Ok(HttpResponse::empty(201)));
        mock.reply(Method::Get, NOTES_PATH, Ok(HttpResponse::new(200, json!([]))));

        view.draft.title = "Groceries".into();
        view.draft.content = "milk".into();
        view.submit_draft().await;

        assert_eq!(view.draft, NoteDraft::default());
        assert_eq!(
            mock.calls()[0].body,
            Some(json!({ "title": "Groceries", "content": "milk" }))
        );
    }

    #[tokio::test]
    async fn test_cancelled_view_ignores_responses() {
        let mock = Arc::new(MockTransport::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let client = ApiClient::new(mock.clone(), TokenStore::in_memory());
        mock.reply(
            Method::Get,
            NOTES_PATH,
            Ok(HttpResponse::new(200, json!([note_json(1, "a")]))),
        );
        mock.set_delay(std::time::Duration::from_millis(50));

        let (handle, token) = crate::cancel::pair();
        let mut view = NotesView::new(client, notifier.clone(), token);

        let unmount = async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            drop(handle);
        };
        tokio::join!(view.mount(), unmount);

        assert!(view.notes().is_empty());
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn test_card_date_format() {
        let note: Note = serde_json::from_value(note_json(1, "a")).unwrap();
        let card = NoteCard::from(&note);
        assert_eq!(card.date, "3/9/2024");
        assert_eq!(card.content, "a body");
    }
}

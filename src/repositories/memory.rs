use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::note_models::{Note, NoteSummary, SearchTerm};
use crate::repositories::note::{NoteRepository, NoteUpdate};

/// プロセス内に保持するノートストア（ローカル開発・テスト用）
///
/// 挿入順を保存順として扱う。
#[derive(Default)]
pub struct InMemoryNoteRepository {
    notes: RwLock<Vec<Note>>,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[async_trait]
impl NoteRepository for InMemoryNoteRepository {
    async fn find_summaries_by_user(
        &self,
        user_id: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<NoteSummary>> {
        let notes = self.notes.read().await;
        let mut owned: Vec<&Note> = notes.iter().filter(|n| n.user == user_id).collect();
        owned.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(owned
            .into_iter()
            .skip(to_usize(skip))
            .take(to_usize(limit))
            .map(NoteSummary::from)
            .collect())
    }

    async fn count_by_user(&self, user_id: &str) -> Result<u64> {
        let notes = self.notes.read().await;
        Ok(notes.iter().filter(|n| n.user == user_id).count() as u64)
    }

    async fn find_by_id(&self, note_id: &ObjectId, user_id: &str) -> Result<Option<Note>> {
        let notes = self.notes.read().await;
        Ok(notes
            .iter()
            .find(|n| n.id == *note_id && n.user == user_id)
            .cloned())
    }

    async fn create(&self, note: Note) -> Result<Note> {
        self.notes.write().await.push(note.clone());
        Ok(note)
    }

    async fn update(&self, note_id: &ObjectId, user_id: &str, update: NoteUpdate) -> Result<bool> {
        let mut notes = self.notes.write().await;
        match notes
            .iter_mut()
            .find(|n| n.id == *note_id && n.user == user_id)
        {
            Some(note) => {
                note.title = update.title;
                note.body = update.body;
                note.updated_at = update.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, note_id: &ObjectId, user_id: &str) -> Result<bool> {
        let mut notes = self.notes.write().await;
        let before = notes.len();
        notes.retain(|n| !(n.id == *note_id && n.user == user_id));
        Ok(notes.len() < before)
    }

    async fn search(&self, user_id: &str, term: &SearchTerm) -> Result<Vec<Note>> {
        let notes = self.notes.read().await;
        Ok(notes
            .iter()
            .filter(|n| n.user == user_id)
            .filter(|n| term.matches(&n.title) || term.matches(&n.body))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn note_at(user: &str, title: &str, minutes_ago: i64) -> Note {
        let mut note = Note::new(user.into(), title.into(), String::new());
        note.updated_at = Utc::now() - Duration::minutes(minutes_ago);
        note.created_at = note.updated_at;
        note
    }

    #[tokio::test]
    async fn summaries_are_newest_first_and_owner_scoped() {
        let repo = InMemoryNoteRepository::new();
        repo.create(note_at("alice", "old", 30)).await.unwrap();
        repo.create(note_at("bob", "bobs", 0)).await.unwrap();
        repo.create(note_at("alice", "new", 1)).await.unwrap();
        repo.create(note_at("alice", "mid", 10)).await.unwrap();

        let titles: Vec<String> = repo
            .find_summaries_by_user("alice", 0, 12)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);

        let second = repo.find_summaries_by_user("alice", 1, 1).await.unwrap();
        assert_eq!(second[0].title, "mid");
        assert_eq!(repo.count_by_user("alice").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn update_and_delete_require_owner() {
        let repo = InMemoryNoteRepository::new();
        let note = repo.create(note_at("alice", "mine", 5)).await.unwrap();

        let update = NoteUpdate {
            title: "stolen".into(),
            body: "stolen".into(),
            updated_at: Utc::now(),
        };
        assert!(!repo.update(&note.id, "mallory", update).await.unwrap());
        assert!(!repo.delete(&note.id, "mallory").await.unwrap());

        let stored = repo.find_by_id(&note.id, "alice").await.unwrap().unwrap();
        assert_eq!(stored, note);
        assert!(repo.find_by_id(&note.id, "mallory").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_keeps_insertion_order() {
        let repo = InMemoryNoteRepository::new();
        repo.create(note_at("alice", "first match", 1)).await.unwrap();
        repo.create(note_at("alice", "nothing", 50)).await.unwrap();
        repo.create(note_at("alice", "MATCH again", 99)).await.unwrap();

        let found = repo
            .search("alice", &SearchTerm::sanitize("match"))
            .await
            .unwrap();
        let titles: Vec<&str> = found.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["first match", "MATCH again"]);
    }
}

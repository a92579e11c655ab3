use crate::{
    error::{AppError, Result},
    note_models::{Note, NoteForm, NotePage, PAGE_SIZE, PageNumber, SearchTerm, total_pages},
    repositories::{NoteRepository, NoteUpdate},
};
use bson::oid::ObjectId;
use chrono::Utc;
use std::sync::Arc;

/// ダッシュボードの各操作。呼び出し元のユーザーIDを必ず受け取り、所有者のノートだけを扱う
pub struct NoteService {
    note_repo: Arc<dyn NoteRepository>,
}

impl NoteService {
    pub fn new(note_repo: Arc<dyn NoteRepository>) -> Self {
        Self { note_repo }
    }

    /// 更新日時の新しい順に1ページ分を返す。範囲外のページは空リスト
    pub async fn list_notes(&self, user_id: &str, page: PageNumber) -> Result<NotePage> {
        let notes = self
            .note_repo
            .find_summaries_by_user(user_id, page.offset(), PAGE_SIZE)
            .await?;
        let count = self.note_repo.count_by_user(user_id).await?;

        Ok(NotePage {
            notes,
            current_page: page.get(),
            total_pages: total_pages(count),
        })
    }

    pub async fn get_note(&self, note_id: &str, user_id: &str) -> Result<Note> {
        let not_found = || AppError::NotFound(format!("Note {} not found", note_id));
        let oid = parse_note_id(note_id).ok_or_else(not_found)?;

        self.note_repo
            .find_by_id(&oid, user_id)
            .await?
            .ok_or_else(not_found)
    }

    // 一致するノートがなくてもエラーにはしない（他人のノートかどうかを漏らさない）
    pub async fn update_note(&self, note_id: &str, user_id: &str, form: NoteForm) -> Result<()> {
        let Some(oid) = parse_note_id(note_id) else {
            tracing::debug!(note_id, "update skipped: malformed note id");
            return Ok(());
        };

        let update = NoteUpdate {
            title: form.title,
            body: form.body,
            updated_at: Utc::now(),
        };
        if !self.note_repo.update(&oid, user_id, update).await? {
            tracing::debug!(note_id, "update matched no note");
        }
        Ok(())
    }

    pub async fn delete_note(&self, note_id: &str, user_id: &str) -> Result<()> {
        let Some(oid) = parse_note_id(note_id) else {
            tracing::debug!(note_id, "delete skipped: malformed note id");
            return Ok(());
        };

        if !self.note_repo.delete(&oid, user_id).await? {
            tracing::debug!(note_id, "delete matched no note");
        }
        Ok(())
    }

    /// 所有者は常に `user_id`。フォーム側の値は使わない
    pub async fn create_note(&self, user_id: &str, form: NoteForm) -> Result<Note> {
        let note = Note::new(user_id.to_string(), form.title, form.body);
        let note = self.note_repo.create(note).await?;
        tracing::info!(note_id = %note.id, "note created");
        Ok(note)
    }

    pub async fn search_notes(&self, user_id: &str, raw_term: &str) -> Result<Vec<Note>> {
        let term = SearchTerm::sanitize(raw_term);
        self.note_repo.search(user_id, &term).await
    }
}

fn parse_note_id(note_id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(note_id).ok()
}

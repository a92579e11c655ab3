use async_trait::async_trait;
use bson::{Document, doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection, IndexModel, options::ClientOptions};
use std::future::IntoFuture;
use std::time::Duration;

use crate::config::MongoDBConfig;
use crate::error::{AppError, Result};
use crate::note_models::{LIST_BODY_CHARS, LIST_TITLE_CHARS, Note, NoteSummary, SearchTerm};

/// 更新で書き換えるフィールド
#[derive(Debug, Clone)]
pub struct NoteUpdate {
    pub title: String,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

/// ノートの保存先。すべての読み書きは `user_id` による所有者フィルタ付きで行う
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// 更新日時の新しい順に `skip` 件読み飛ばし、最大 `limit` 件を一覧用に切り詰めて返す
    async fn find_summaries_by_user(
        &self,
        user_id: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<NoteSummary>>;
    async fn count_by_user(&self, user_id: &str) -> Result<u64>;
    async fn find_by_id(&self, note_id: &ObjectId, user_id: &str) -> Result<Option<Note>>;
    async fn create(&self, note: Note) -> Result<Note>;
    /// 一致するノートがあれば `true`
    async fn update(&self, note_id: &ObjectId, user_id: &str, update: NoteUpdate) -> Result<bool>;
    /// 削除できたら `true`
    async fn delete(&self, note_id: &ObjectId, user_id: &str) -> Result<bool>;
    /// 保存順で返す
    async fn search(&self, user_id: &str, term: &SearchTerm) -> Result<Vec<Note>>;
}

// MongoDB Implementation
pub struct MongoNoteRepository {
    collection: Collection<Note>,
    timeout: Duration,
}

impl MongoNoteRepository {
    pub fn new(collection: Collection<Note>, timeout: Duration) -> Self {
        Self {
            collection,
            timeout,
        }
    }

    /// 設定からクライアントを作成して接続する
    pub async fn connect(config: &MongoDBConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut options = ClientOptions::parse(&config.connection_uri).await?;
        options.app_name = Some("notes-dashboard".to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options)?;
        let collection = client
            .database(&config.db_name)
            .collection::<Note>(&config.collection);

        tracing::info!(
            db = %config.db_name,
            collection = %config.collection,
            "MongoDB note repository configured"
        );
        Ok(Self::new(collection, timeout))
    }

    /// 一覧クエリ用の複合インデックスを作成する
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "user": 1, "updatedAt": -1 })
            .build();
        self.bounded("create_index", self.collection.create_index(index))
            .await?;
        Ok(())
    }

    /// すべての操作にタイムアウトをかける
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::DatabaseError(format!(
                "{op} timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

}

//////
// クエリ文書の組み立て。どのフィルタにも必ず `user` を含める

fn user_filter(user_id: &str) -> Document {
    doc! { "user": user_id }
}

fn owner_filter(note_id: &ObjectId, user_id: &str) -> Document {
    doc! { "_id": *note_id, "user": user_id }
}

/// 一覧用パイプライン。並びは updatedAt 降順、同時刻は _id 降順
fn summary_pipeline(user_id: &str, skip: u64, limit: u64) -> Vec<Document> {
    let skip = i64::try_from(skip).unwrap_or(i64::MAX);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let title_chars = LIST_TITLE_CHARS as i64;
    let body_chars = LIST_BODY_CHARS as i64;
    vec![
        doc! { "$match": user_filter(user_id) },
        doc! { "$sort": { "updatedAt": -1, "_id": -1 } },
        doc! { "$skip": skip },
        doc! { "$limit": limit },
        doc! { "$project": {
            "title": { "$substrCP": [ { "$ifNull": ["$title", ""] }, 0, title_chars ] },
            "body": { "$substrCP": [ { "$ifNull": ["$body", ""] }, 0, body_chars ] },
            "updatedAt": 1,
        } },
    ]
}

fn update_changes(update: NoteUpdate) -> Document {
    doc! { "$set": {
        "title": update.title,
        "body": update.body,
        "updatedAt": bson::DateTime::from_chrono(update.updated_at),
    } }
}

fn search_filter(user_id: &str, term: &SearchTerm) -> Document {
    // term はサニタイズ済みなので正規表現のメタ文字は含まれない
    let pattern = doc! { "$regex": term.as_str(), "$options": "i" };
    doc! {
        "user": user_id,
        "$or": [
            { "title": pattern.clone() },
            { "body": pattern },
        ],
    }
}

#[async_trait]
impl NoteRepository for MongoNoteRepository {
    async fn find_summaries_by_user(
        &self,
        user_id: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<NoteSummary>> {
        let pipeline = summary_pipeline(user_id, skip, limit);

        let docs = self
            .bounded("aggregate", async {
                let cursor = self.collection.aggregate(pipeline).await?;
                let docs: Vec<Document> = cursor.try_collect().await?;
                Ok::<_, mongodb::error::Error>(docs)
            })
            .await?;

        docs.into_iter()
            .map(|d| {
                bson::from_document::<NoteSummary>(d)
                    .map_err(|e| AppError::DatabaseError(e.to_string()))
            })
            .collect()
    }

    async fn count_by_user(&self, user_id: &str) -> Result<u64> {
        self.bounded(
            "count_documents",
            self.collection.count_documents(user_filter(user_id)),
        )
        .await
    }

    async fn find_by_id(&self, note_id: &ObjectId, user_id: &str) -> Result<Option<Note>> {
        self.bounded(
            "find_one",
            self.collection
                .find_one(owner_filter(note_id, user_id)),
        )
        .await
    }

    async fn create(&self, note: Note) -> Result<Note> {
        self.bounded("insert_one", self.collection.insert_one(&note))
            .await?;
        Ok(note)
    }

    async fn update(&self, note_id: &ObjectId, user_id: &str, update: NoteUpdate) -> Result<bool> {
        let changes = update_changes(update);
        let result = self
            .bounded(
                "update_one",
                self.collection
                    .update_one(owner_filter(note_id, user_id), changes),
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, note_id: &ObjectId, user_id: &str) -> Result<bool> {
        let result = self
            .bounded(
                "delete_one",
                self.collection
                    .delete_one(owner_filter(note_id, user_id)),
            )
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn search(&self, user_id: &str, term: &SearchTerm) -> Result<Vec<Note>> {
        let filter = search_filter(user_id, term);

        self.bounded("find", async {
            let cursor = self.collection.find(filter).await?;
            let notes: Vec<Note> = cursor.try_collect().await?;
            Ok::<_, mongodb::error::Error>(notes)
        })
        .await
    }
}

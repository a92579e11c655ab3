use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一覧画面の1ページあたりの件数
pub const PAGE_SIZE: u64 = 12;
/// 一覧画面で表示するタイトルの最大文字数
pub const LIST_TITLE_CHARS: usize = 30;
/// 一覧画面で表示する本文の最大文字数
pub const LIST_BODY_CHARS: usize = 100;

/// 保存されるノート本体。`user` は作成者のIDで、作成後は変更しない
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(user: String, title: String, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            user,
            title,
            body,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 一覧表示用の射影。タイトルと本文は表示用に切り詰め済み
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Note> for NoteSummary {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            title: truncate_chars(&note.title, LIST_TITLE_CHARS),
            body: truncate_chars(&note.body, LIST_BODY_CHARS),
            updated_at: note.updated_at,
        }
    }
}

/// ダッシュボード1ページ分の結果
#[derive(Debug, Clone)]
pub struct NotePage {
    pub notes: Vec<NoteSummary>,
    pub current_page: u64,
    pub total_pages: u64,
}

/// 1始まりのページ番号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber(u64);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    /// クエリの `page` を解釈する。数値でない・0以下・未指定はすべて1ページ目
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|&n| n >= 1)
            .map(PageNumber)
            .unwrap_or(Self::FIRST)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// 読み飛ばす件数 `(page - 1) * PAGE_SIZE`
    pub fn offset(self) -> u64 {
        (self.0 - 1).saturating_mul(PAGE_SIZE)
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

pub fn total_pages(count: u64) -> u64 {
    count.div_ceil(PAGE_SIZE)
}

/// 英数字と半角スペース以外を取り除いた検索語
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn sanitize(raw: &str) -> Self {
        SearchTerm(
            raw.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 大文字小文字を区別しない部分一致。空の検索語はすべてに一致する
    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.0.to_lowercase())
    }
}

/// 文字境界を壊さずに先頭 `max` 文字を返す
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// 追加・更新フォーム。`user` などの余計なフィールドは受け取っても無視する
#[derive(Deserialize, Debug, Default)]
pub struct NoteForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct SearchForm {
    #[serde(rename = "searchTerm", default)]
    pub search_term: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_defaults_to_first_page() {
        assert_eq!(PageNumber::parse(None), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("abc")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("0")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("-3")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("2abc")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some(" 3 ")).get(), 3);
    }

    #[test]
    fn page_offset_and_total_pages() {
        assert_eq!(PageNumber::FIRST.offset(), 0);
        assert_eq!(PageNumber::parse(Some("3")).offset(), 24);
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(12), 1);
        assert_eq!(total_pages(13), 2);
    }

    #[test]
    fn huge_page_offset_saturates() {
        let page = PageNumber::parse(Some(&u64::MAX.to_string()));
        assert_eq!(page.offset(), u64::MAX);
    }

    #[test]
    fn truncation_keeps_short_text() {
        let long = "a".repeat(50);
        assert_eq!(truncate_chars(&long, LIST_TITLE_CHARS), "a".repeat(30));
        assert_eq!(truncate_chars("hello", LIST_TITLE_CHARS), "hello");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "ノート".repeat(20);
        let truncated = truncate_chars(&text, LIST_TITLE_CHARS);
        assert_eq!(truncated.chars().count(), 30);
    }

    #[test]
    fn summary_truncates_without_touching_note() {
        let note = Note::new("u1".into(), "t".repeat(50), "b".repeat(150));
        let summary = NoteSummary::from(&note);
        assert_eq!(summary.title.len(), 30);
        assert_eq!(summary.body.len(), 100);
        assert_eq!(note.title.len(), 50);
    }

    #[test]
    fn sanitize_strips_pattern_metacharacters() {
        assert_eq!(SearchTerm::sanitize("abc$%^def").as_str(), "abcdef");
        assert_eq!(SearchTerm::sanitize(".*(a|b)+").as_str(), "ab");
        assert_eq!(SearchTerm::sanitize("abc def").as_str(), "abc def");
        assert!(SearchTerm::sanitize("$^.*").is_empty());
    }

    #[test]
    fn search_matching_is_case_insensitive() {
        let term = SearchTerm::sanitize("abc$%^def");
        assert!(term.matches("xAbCdEfy"));
        assert!(!term.matches("abc def"));
        assert!(SearchTerm::sanitize("abc def").matches("abc def"));
        assert!(SearchTerm::sanitize("").matches("anything"));
    }
}

use axum::response::Html;
use chrono::{DateTime, Utc};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::error::Result;
use crate::note_models::{Note, NotePage, NoteSummary};

const TEMPLATES: &[(&str, &str)] = &[
    (
        "layouts/dashboard.html",
        include_str!("../templates/layouts/dashboard.html"),
    ),
    (
        "dashboard/index.html",
        include_str!("../templates/dashboard/index.html"),
    ),
    (
        "dashboard/view-note.html",
        include_str!("../templates/dashboard/view-note.html"),
    ),
    (
        "dashboard/add.html",
        include_str!("../templates/dashboard/add.html"),
    ),
    (
        "dashboard/search.html",
        include_str!("../templates/dashboard/search.html"),
    ),
];

/// テンプレートに渡すノートの表示形式
#[derive(Serialize, Debug)]
struct NoteView {
    id: String,
    title: String,
    body: String,
    updated_at: String,
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

impl From<&NoteSummary> for NoteView {
    fn from(s: &NoteSummary) -> Self {
        Self {
            id: s.id.to_hex(),
            title: s.title.clone(),
            body: s.body.clone(),
            updated_at: format_time(&s.updated_at),
        }
    }
}

impl From<&Note> for NoteView {
    fn from(n: &Note) -> Self {
        Self {
            id: n.id.to_hex(),
            title: n.title.clone(),
            body: n.body.clone(),
            updated_at: format_time(&n.updated_at),
        }
    }
}

/// サーバーサイドレンダリング。`.html` のテンプレートは自動でエスケープされる
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<Html<String>> {
        let html = self.env.get_template(name)?.render(ctx)?;
        Ok(Html(html))
    }

    pub fn dashboard(&self, user: &CurrentUser, page: &NotePage) -> Result<Html<String>> {
        let notes: Vec<NoteView> = page.notes.iter().map(NoteView::from).collect();
        self.render(
            "dashboard/index.html",
            context! {
                title => "Dashboard",
                user_name => &user.first_name,
                notes => notes,
                current => page.current_page,
                pages => page.total_pages,
            },
        )
    }

    pub fn view_note(&self, note: &Note) -> Result<Html<String>> {
        self.render(
            "dashboard/view-note.html",
            context! {
                title => "View Note",
                note_id => note.id.to_hex(),
                note => NoteView::from(note),
            },
        )
    }

    pub fn add_note(&self) -> Result<Html<String>> {
        self.render("dashboard/add.html", context! { title => "Add Note" })
    }

    /// `results` が `None` なら検索フォームだけを表示する
    pub fn search(&self, results: Option<&[Note]>) -> Result<Html<String>> {
        let searched = results.is_some();
        let results: Vec<NoteView> = results
            .unwrap_or_default()
            .iter()
            .map(NoteView::from)
            .collect();
        self.render(
            "dashboard/search.html",
            context! {
                title => "Search",
                searched => searched,
                results => results,
            },
        )
    }
}

pub mod analytics;
pub mod api;
pub mod auth;
pub mod clients;
pub mod contacts;
pub mod overview;
pub mod payments;
pub mod subscriptions;
pub mod users;

use axum::{
    extract::{Query, State},
    response::Html,
};
use askama::Template;
use serde::{Deserialize, Deserializer};

use crate::{
    error::AppError,
    middleware::CurrentAdmin,
    state::AppState,
    utils::Page,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Overview,
    Clients,
    Users,
    Payments,
    Analytics,
    Subscriptions,
    Contacts,
}

impl Tab {
    pub const ALL: [Tab; 7] = [
        Tab::Overview,
        Tab::Clients,
        Tab::Users,
        Tab::Payments,
        Tab::Analytics,
        Tab::Subscriptions,
        Tab::Contacts,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Clients => "clients",
            Tab::Users => "users",
            Tab::Payments => "payments",
            Tab::Analytics => "analytics",
            Tab::Subscriptions => "subscriptions",
            Tab::Contacts => "contacts",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Clients => "Clients",
            Tab::Users => "Users",
            Tab::Payments => "Payments",
            Tab::Analytics => "Analytics",
            Tab::Subscriptions => "Subscriptions",
            Tab::Contacts => "Contact Submissions",
        }
    }
}

/// Query string shared by every tab: `?tab=users&q=acme&page=2`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub tab: Option<Tab>,
    pub q: Option<String>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<usize>,
}

/// `?page=` and `?page=abc` read as no page at all.
fn lenient_page<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

impl ListQuery {
    pub fn term(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn page(&self) -> usize {
        self.page.unwrap_or(1)
    }
}

/// Everything the pager and search box need besides the rows.
pub struct ListView {
    pub q: String,
    pub action: String,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    pub from: usize,
    pub to: usize,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

impl ListView {
    pub fn new<T>(action: &str, query: &ListQuery, page: &Page<T>) -> Self {
        let href = |n: usize| {
            format!(
                "{}?q={}&page={}",
                action,
                urlencoding::encode(query.term()),
                n
            )
        };
        Self {
            q: query.term().to_string(),
            action: action.to_string(),
            page: page.page,
            total_pages: page.total_pages,
            total: page.total,
            from: page.from,
            to: page.to,
            prev_href: page.has_prev.then(|| href(page.prev_page)),
            next_href: page.has_next.then(|| href(page.next_page)),
        }
    }
}

pub struct TabLink {
    pub href: String,
    pub title: &'static str,
    pub active: bool,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    admin_email: String,
    title: &'static str,
    tabs: Vec<TabLink>,
    content: String,
}

/// Wraps one tab's rendered content in the page shell.
pub fn shell(admin: &CurrentAdmin, active: Tab, content: String) -> Result<Html<String>, AppError> {
    let tabs = Tab::ALL
        .iter()
        .map(|tab| TabLink {
            href: format!("/dashboard?tab={}", tab.slug()),
            title: tab.title(),
            active: *tab == active,
        })
        .collect();

    let template = DashboardTemplate {
        admin_email: admin.email.clone(),
        title: active.title(),
        tabs,
        content,
    };
    Ok(Html(template.render()?))
}

async fn render_tab(
    state: &AppState,
    tab: Tab,
    query: &ListQuery,
) -> Result<String, AppError> {
    match tab {
        Tab::Overview => overview::content(state).await,
        Tab::Clients => clients::content(state, query).await,
        Tab::Users => users::content(state, query).await,
        Tab::Payments => payments::content(state).await,
        Tab::Analytics => analytics::content(state).await,
        Tab::Subscriptions => subscriptions::content(state, query).await,
        Tab::Contacts => contacts::content(state, query).await,
    }
}

pub async fn dashboard(
    admin: CurrentAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let tab = query.tab.unwrap_or_default();
    let content = render_tab(&state, tab, &query).await?;
    shell(&admin, tab, content)
}

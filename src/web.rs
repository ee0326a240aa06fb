use crate::{
    chart::{self, MIME_TYPE},
    compute::aggregate,
    config::Config,
    data::{ChartKind, DateRange, Error, Listed},
    store::{Store, StoreError},
    validate::{validate, AddForm, Clock},
};
use anyhow::Context;
use axum::{
    extract::{FromRef, Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar};
use serde::Deserialize;
use std::{fmt::Write, io, sync::Arc};
use tracing::{error, info, warn};

const NOTICE: &str = "notice";
const ADDED: &str = "Expense added successfully!";
const STORAGE_FAILURE: &str = "Could not access the expense file.";

/// What every handler gets: the store, the clock used for default dates, and
/// the key the notice cookie is encrypted with. Handlers keep no state of
/// their own.
#[derive(Clone)]
pub(crate) struct AppState {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

impl AppState {
    /// Builds the state from the configuration and makes sure the store exists.
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, anyhow::Error> {
        config.check()?;
        let key = match &config.secret {
            Some(secret) => Key::derive_from(secret.as_bytes()),
            None => Key::generate(),
        };
        let store = Store::new(&config.store);
        store
            .initialize()
            .with_context(|| format!("cannot initialize {}", store.path().display()))?;
        Ok(Self {
            store: Arc::new(store),
            clock,
            key,
        })
    }
}

pub(crate) fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/add", get(add_form).post(add_expense))
        .route("/expenses", get(list_expenses))
        .route("/delete/:row_index", post(delete_expense))
        .route("/visualize/:chart_type", get(visualize))
        .with_state(state)
}

/// Pops the pending notice, if any. The cookie is cleared on the way out so
/// the notice shows only once.
fn take_notice(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<String>) {
    match jar.get(NOTICE) {
        Some(cookie) => {
            let text = cookie.value().to_string();
            (jar.remove(Cookie::build(NOTICE).path("/")), Some(text))
        }
        None => (jar, None),
    }
}

fn redirect_with_notice(jar: PrivateCookieJar, text: impl Into<String>, to: &str) -> Response {
    let jar = jar.add(Cookie::build((NOTICE, text.into())).path("/"));
    (jar, Redirect::to(to)).into_response()
}

fn store_notice(e: StoreError) -> String {
    match e {
        StoreError::Missing => Error::StoreMissing.to_string(),
        StoreError::InvalidIndex(index) => Error::InvalidIndex(index.to_string()).to_string(),
        e => {
            error!("store failure: {e}");
            STORAGE_FAILURE.to_string()
        }
    }
}

/// Store calls do blocking file I/O, so they run on the blocking pool.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| StoreError::Io(io::Error::other(e)))?
}

async fn home(jar: PrivateCookieJar) -> impl IntoResponse {
    let (jar, notice) = take_notice(jar);
    let body = "\
<ul>
<li><a href=\"/add\">Add an expense</a></li>
<li><a href=\"/expenses\">View expenses</a></li>
<li><a href=\"/visualize/pie\">Spending by category (pie)</a></li>
<li><a href=\"/visualize/bar\">Spending by category (bar)</a></li>
</ul>";
    (jar, page("Expense tracker", notice.as_deref(), body))
}

async fn add_form(State(state): State<AppState>, jar: PrivateCookieJar) -> impl IntoResponse {
    let (jar, notice) = take_notice(jar);
    let today = state.clock.today().format(crate::data::DATE_FORMAT);
    let body = format!(
        "\
<form method=\"post\" action=\"/add\">
<label>Date <input name=\"date\" value=\"{today}\"></label>
<label>Category <input name=\"category\" required></label>
<label>Amount <input name=\"amount\" required></label>
<label>Note <input name=\"note\"></label>
<button type=\"submit\">Add</button>
</form>"
    );
    (jar, page("Add expense", notice.as_deref(), &body))
}

async fn add_expense(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<AddForm>,
) -> Response {
    let expense = match validate(form, state.clock.as_ref()) {
        Ok(expense) => expense,
        Err(e) => {
            warn!("rejected expense: {e}");
            return redirect_with_notice(jar, e.to_string(), "/add");
        }
    };
    let row = expense.clone();
    match with_store(&state, move |store| store.append(&row)).await {
        Ok(()) => {
            info!(date = %expense.date, category = %expense.category, amount = %expense.amount, "expense added");
            redirect_with_notice(jar, ADDED, "/add")
        }
        Err(e) => redirect_with_notice(jar, store_notice(e), "/add"),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

impl ListParams {
    /// The filter only applies when both bounds are given.
    fn range(&self) -> Option<DateRange> {
        match (self.start_date.as_deref(), self.end_date.as_deref()) {
            (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => Some(DateRange {
                start: start.to_string(),
                end: end.to_string(),
            }),
            _ => None,
        }
    }
}

async fn list_expenses(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let (jar, mut notice) = take_notice(jar);
    let range = params.range();
    let expenses = match with_store(&state, move |store| store.read_all(range.as_ref())).await {
        Ok(expenses) => expenses,
        Err(e) => {
            notice = Some(store_notice(e));
            Vec::new()
        }
    };
    let body = expense_table(
        &expenses,
        params.start_date.as_deref().unwrap_or_default(),
        params.end_date.as_deref().unwrap_or_default(),
    );
    (jar, page("Expenses", notice.as_deref(), &body))
}

fn expense_table(expenses: &[Listed], start: &str, end: &str) -> String {
    let mut body = format!(
        "\
<form method=\"get\" action=\"/expenses\">
<label>From <input name=\"start_date\" value=\"{}\"></label>
<label>To <input name=\"end_date\" value=\"{}\"></label>
<button type=\"submit\">Filter</button>
</form>
",
        escape(start),
        escape(end)
    );
    if expenses.is_empty() {
        body.push_str("<p>No expenses.</p>");
        return body;
    }
    body.push_str("<table>\n<tr><th>#</th><th>Date</th><th>Category</th><th>Amount</th><th>Note</th><th></th></tr>\n");
    for Listed { index, expense } in expenses {
        // Writing into a String cannot fail.
        let _ = writeln!(
            body,
            "<tr><td>{index}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
<td><form method=\"post\" action=\"/delete/{index}\"><button type=\"submit\">Delete</button></form></td></tr>",
            escape(&expense.date),
            escape(&expense.category),
            escape(&expense.amount),
            escape(&expense.note),
        );
    }
    body.push_str("</table>");
    body
}

async fn delete_expense(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Path(row_index): Path<String>,
) -> Response {
    let Ok(index) = row_index.parse::<usize>() else {
        warn!(%row_index, "delete with a non-numeric index");
        return redirect_with_notice(jar, Error::InvalidIndex(row_index).to_string(), "/expenses");
    };
    let text = match with_store(&state, move |store| store.delete_at(index)).await {
        Ok(row) => {
            let row = row
                .iter()
                .map(String::from_utf8_lossy)
                .collect::<Vec<_>>()
                .join(",");
            info!(index, %row, "expense removed");
            format!("Deleted expense: {row}")
        }
        Err(e) => {
            warn!(index, "delete failed: {e}");
            store_notice(e)
        }
    };
    redirect_with_notice(jar, text, "/expenses")
}

async fn visualize(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Path(chart_type): Path<String>,
) -> Response {
    let summary = match with_store(&state, |store| store.read_all(None)).await {
        Ok(expenses) => aggregate(expenses),
        Err(e) => return redirect_with_notice(jar, store_notice(e), "/"),
    };
    if summary.is_empty() {
        return redirect_with_notice(jar, Error::NothingToVisualize.to_string(), "/");
    }
    let kind = match chart_type.parse::<ChartKind>() {
        Ok(kind) => kind,
        Err(e) => {
            warn!(%chart_type, "unknown chart type");
            return redirect_with_notice(jar, e.to_string(), "/");
        }
    };
    let rendered = tokio::task::spawn_blocking(move || chart::render(&summary, kind)).await;
    match rendered {
        Ok(Ok(png)) => ([(header::CONTENT_TYPE, MIME_TYPE)], png).into_response(),
        Ok(Err(e)) => {
            error!(%kind, "chart rendering failed: {e:#}");
            redirect_with_notice(jar, Error::NothingToVisualize.to_string(), "/")
        }
        Err(e) => {
            error!(%kind, "chart rendering panicked: {e}");
            redirect_with_notice(jar, Error::NothingToVisualize.to_string(), "/")
        }
    }
}

fn page(title: &str, notice: Option<&str>, body: &str) -> Html<String> {
    let notice = notice
        .map(|n| format!("<p class=\"notice\">{}</p>\n", escape(n)))
        .unwrap_or_default();
    Html(format!(
        "\
<!DOCTYPE html>
<html>
<head><meta charset=\"utf-8\"><title>{title}</title></head>
<body>
<nav><a href=\"/\">Home</a> | <a href=\"/add\">Add</a> | <a href=\"/expenses\">Expenses</a></nav>
<h1>{title}</h1>
{notice}{body}
</body>
</html>
"
    ))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

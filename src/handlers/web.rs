use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::assets::{APP_JS, INDEX_HTML, STYLE_CSS};
use crate::AppState;

/// Serves the single-page client. `/`, `/login` and `/register` all land
/// here; the client picks the view from the path.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(inject_base_path(INDEX_HTML, &state.base_path))
}

pub async fn static_file(Path(path): Path<String>) -> Response {
    match path.as_str() {
        "app.js" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/javascript")],
            APP_JS,
        )
            .into_response(),
        "style.css" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/css")],
            STYLE_CSS,
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn inject_base_path(html: &str, base_path: &str) -> String {
    let script = format!(r#"<script>window.BASE_PATH = "{}";</script>"#, base_path);
    let html = html.replace("<head>", &format!("<head>\n    {}", script));

    html.replace("href=\"/static/", &format!("href=\"{}/static/", base_path))
        .replace("src=\"/static/", &format!("src=\"{}/static/", base_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_is_injected() {
        let html = r#"<head><link href="/static/style.css"></head><script src="/static/app.js"></script>"#;
        let out = inject_base_path(html, "/tasks");
        assert!(out.contains(r#"window.BASE_PATH = "/tasks";"#));
        assert!(out.contains(r#"href="/tasks/static/style.css""#));
        assert!(out.contains(r#"src="/tasks/static/app.js""#));
    }
}

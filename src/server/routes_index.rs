use crate::server::AppContext;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

const INDEX_TEMPLATE: &str = include_str!("../../static/index.html");
const OUTPUT_PATH_PLACEHOLDER: &str = "{{outputPath}}";

pub fn index_routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
}

async fn index(State(ctx): State<AppContext>) -> Html<String> {
    Html(render_index(&ctx.config.output_path()))
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

fn render_index(output_path: &str) -> String {
    INDEX_TEMPLATE.replace(OUTPUT_PATH_PLACEHOLDER, &escape_html(output_path))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

use axum::response::{Html, IntoResponse};

const LANDING_PAGE: &str = r#"<html>
<head><title>HStream Exporter</title></head>
<body>
<h1>HStream Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

pub async fn landing_page() -> impl IntoResponse {
    Html(LANDING_PAGE)
}

//! Host page embedding the widget.

use super::{WidgetView, render_widget};

/// Render the full HTML document for a fresh widget.
#[must_use]
pub fn render_page(title: &str, state: WidgetView) -> String {
    let widget = render_widget(state);
    format!(
        r#"<!DOCTYPE html>
<html lang="en" class="dark">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Bujji AI assistant">
    <title>{title}</title>

    <script src="https://unpkg.com/htmx.org@2.0.8/dist/htmx.min.js"></script>
    <script defer src="/static/bujji.js"></script>
    <link rel="stylesheet" href="/static/bujji.css">
</head>
<body class="min-h-screen bg-background text-foreground antialiased">
    <main id="app" class="container mx-auto px-4 py-6 max-w-5xl">
        <h1 class="text-2xl font-bold">{title}</h1>
        <p class="text-muted-foreground">Tap the orb to talk to Bujji.</p>
    </main>
    {widget}
</body>
</html>"#
    )
}

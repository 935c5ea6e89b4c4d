//! HTML views rendered with Handlebars.

use crate::error::ServeError;
use axum::response::{Html, IntoResponse, Response};
use handlebars::Handlebars;
use serde_json::json;

const TEMPLATES: [(&str, &str); 4] = [
    ("index", include_str!("../templates/index.hbs")),
    ("result", include_str!("../templates/result.hbs")),
    ("train", include_str!("../templates/train.hbs")),
    ("error", include_str!("../templates/error.hbs")),
];

const PARTIALS: [(&str, &str); 2] = [
    ("page_head", include_str!("../templates/partials/page_head.hbs")),
    ("page_foot", include_str!("../templates/partials/page_foot.hbs")),
];

/// Compiled page templates.
pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self, ServeError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        for (name, source) in PARTIALS {
            registry
                .register_partial(name, source)
                .map_err(Box::new)?;
        }
        for (name, source) in TEMPLATES {
            registry
                .register_template_string(name, source)
                .map_err(Box::new)?;
        }
        Ok(Self { registry })
    }

    pub fn render(&self, name: &str, data: &serde_json::Value) -> Result<String, ServeError> {
        Ok(self.registry.render(name, data)?)
    }

    /// Render `err` as an HTML page with its HTTP status.
    pub fn error_response(&self, err: &ServeError) -> Response {
        let status = err.status();
        let data = json!({
            "title": err.title(),
            "message": err.to_string(),
            "details": err.details(),
            "status": status.as_u16(),
        });
        match self.render("error", &data) {
            Ok(page) => (status, Html(page)).into_response(),
            Err(render_err) => {
                tracing::error!(error = %render_err, "failed to render error page");
                (status, err.to_string()).into_response()
            }
        }
    }
}

//! Page templates.
//!
//! Templates are looked up by name in each search directory in order, then
//! among the embedded defaults. A name found nowhere renders as an empty
//! template, so a missing partial never fails a page.

use std::fs;
use std::path::PathBuf;

use minijinja::value::Value;
use minijinja::{context, Environment};

use crate::config::SiteConfig;

/// Variables available to a page template.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub title: String,
    pub date: String,
    pub body_class: String,
    pub year: i32,
    /// Relative prefix from the page to the output root (`""`, `"../"`, ...)
    pub root: String,
    /// Root-prefixed stylesheet href
    pub style_css: String,
    /// Rendered document HTML
    pub content: String,
    /// Analytics snippet, empty when disabled
    pub google_analytics: String,
    /// Live-reload client, empty outside serve mode
    pub dev_reload: String,
}

/// Template engine using minijinja.
#[derive(Clone)]
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create an engine searching `dirs` before the embedded defaults.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        let mut env = Environment::new();

        env.set_loader(move |name| {
            for dir in &dirs {
                let path = dir.join(name);
                if !path.is_file() {
                    continue;
                }
                match fs::read_to_string(&path) {
                    Ok(source) => return Ok(Some(source)),
                    Err(e) => {
                        tracing::warn!("Failed to read template {}: {}", path.display(), e);
                        return Ok(Some(String::new()));
                    }
                }
            }

            match default_template(name) {
                Some(source) => Ok(Some(source.to_string())),
                None => {
                    tracing::warn!("Template {} not found, rendering it empty", name);
                    Ok(Some(String::new()))
                }
            }
        });

        Self { env }
    }

    /// Engine for `config`: local templates, then the theme's.
    pub fn for_config(config: &SiteConfig) -> Self {
        let mut dirs = vec![config.templates_dir.clone()];
        if let Some(theme) = &config.theme_dir {
            dirs.push(theme.join("templates"));
        }
        Self::new(dirs)
    }

    /// Render the template `name` with `page`.
    ///
    /// Markup and URL variables are passed through unescaped.
    pub fn render_page(&self, name: &str, page: &PageContext) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(name)?;

        tmpl.render(context! {
            title => &page.title,
            date => &page.date,
            body_class => &page.body_class,
            year => page.year,
            root => Value::from_safe_string(page.root.clone()),
            style_css => Value::from_safe_string(page.style_css.clone()),
            content => Value::from_safe_string(page.content.clone()),
            google_analytics => Value::from_safe_string(page.google_analytics.clone()),
            dev_reload => Value::from_safe_string(page.dev_reload.clone()),
        })
    }
}

fn default_template(name: &str) -> Option<&'static str> {
    match name {
        "page.html" => Some(PAGE_TEMPLATE),
        "header.html" => Some(HEADER_TEMPLATE),
        "footer.html" => Some(FOOTER_TEMPLATE),
        _ => None,
    }
}

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ title }}</title>
  <link rel="stylesheet" href="{{ style_css }}">
  {{ google_analytics }}
</head>
<body class="{{ body_class }}">
  {% include "header.html" %}
  <main class="content">
    {% if date %}<time class="date">{{ date }}</time>{% endif %}
    {{ content }}
  </main>
  {% include "footer.html" %}
  {{ dev_reload }}
</body>
</html>
"##;

const HEADER_TEMPLATE: &str = r##"<header class="site-header">
  <a class="site-home" href="{{ root }}">Home</a>
</header>"##;

const FOOTER_TEMPLATE: &str = r##"<footer class="site-footer">
  <p>&copy; {{ year }}</p>
</footer>"##;

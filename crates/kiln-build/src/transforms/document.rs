use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::Datelike;
use kiln_markdown::{parse_document, render_markdown};

use crate::config::SiteConfig;
use crate::context::{BuildContext, SourceFile, TreeRoot};
use crate::dispatch::{OutputKind, Transform, TransformError, TransformOutput};
use crate::images::ResponsiveImages;
use crate::listings::{posts_list, projects_markup};
use crate::templates::{PageContext, TemplateEngine};

use super::write_output;

/// Output-relative stylesheet substituted into every page.
pub const STYLE_CSS: &str = "static/css/style.css";

/// Renders a markdown document through the page template to `<stem>.html`.
///
/// Runs after every asset so the page sees the complete manifest.
#[derive(Clone)]
pub struct DocumentTransform {
    config: Arc<SiteConfig>,
    templates: TemplateEngine,
}

impl DocumentTransform {
    pub fn new(config: Arc<SiteConfig>, templates: TemplateEngine) -> Self {
        Self { config, templates }
    }

    /// Substitute the generated listings into the site index body.
    fn expand_listings(&self, body: String) -> String {
        let projects = projects_markup(&self.config.source_dir, &self.config.images);

        body.replace("{{postsList}}", &posts_list(&self.config.source_dir))
            .replace("{{projectsFeatured}}", &projects.featured)
            .replace("{{projectsGrid}}", &projects.grid)
    }
}

/// Relative prefix from an output-relative page path to the output root.
fn root_prefix(output_rel: &str) -> String {
    "../".repeat(output_rel.matches('/').count())
}

fn analytics_snippet(id: &str) -> String {
    format!(
        r#"<script async src="https://www.googletagmanager.com/gtag/js?id={id}"></script>
<script>
  window.dataLayer = window.dataLayer || [];
  function gtag(){{dataLayer.push(arguments);}}
  gtag('js', new Date());
  gtag('config', '{id}');
</script>"#
    )
}

impl Transform for DocumentTransform {
    fn name(&self) -> &'static str {
        "document"
    }

    fn extensions(&self) -> &[&'static str] {
        &["md"]
    }

    fn kind(&self) -> OutputKind {
        OutputKind::Document
    }

    fn process(
        &self,
        ctx: &BuildContext,
        file: &SourceFile,
    ) -> Result<TransformOutput, TransformError> {
        let source = fs::read_to_string(&file.src).map_err(|e| TransformError::io(&file.src, e))?;
        let doc = parse_document(&source).map_err(|e| TransformError::Parse(e.to_string()))?;

        let is_index = file.root == TreeRoot::Content && file.rel == "index.md";
        let root = root_prefix(&file.output_rel);

        let mut body = doc.body.replace("{{root}}", &root);
        if is_index {
            body = self.expand_listings(body);
        }

        let images = ResponsiveImages {
            policy: &self.config.images,
            base_dir: file.src.parent().unwrap_or(Path::new("")),
        };
        let content = render_markdown(&body, Some(&images));

        let page = PageContext {
            title: doc.frontmatter.title.clone().unwrap_or_default(),
            date: doc.frontmatter.date.clone().unwrap_or_default(),
            body_class: if is_index {
                "home".to_string()
            } else {
                doc.frontmatter.body_class.clone().unwrap_or_default()
            },
            year: chrono::Local::now().year(),
            style_css: format!("{}{}", root, ctx.manifest.resolve(STYLE_CSS)),
            content,
            google_analytics: self
                .config
                .google_analytics
                .as_deref()
                .map(analytics_snippet)
                .unwrap_or_default(),
            dev_reload: ctx.options.dev_reload.clone().unwrap_or_default(),
            root,
        };

        let html = self
            .templates
            .render_page(&self.config.page_template, &page)
            .map_err(|e| TransformError::Template(e.to_string()))?;
        let page_dir = file.output_rel.rsplit_once('/').map_or("", |(dir, _)| dir);
        let html = ctx
            .manifest
            .rewrite_in(&html.replace("{{root}}", &page.root), page_dir);

        let dest = file.dest.with_extension("html");
        write_output(&dest, html)?;
        tracing::info!("Built: {}", dest.display());

        Ok(TransformOutput::single(dest))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::context::BuildOptions;
    use crate::transforms::test_support::content_file;

    fn transform(source_dir: &Path) -> DocumentTransform {
        let config = SiteConfig {
            source_dir: source_dir.to_path_buf(),
            google_analytics: Some("G-TEST".to_string()),
            ..Default::default()
        };
        DocumentTransform::new(Arc::new(config), TemplateEngine::new(Vec::new()))
    }

    #[test]
    fn computes_root_prefix() {
        assert_eq!(root_prefix("index.md"), "");
        assert_eq!(root_prefix("posts/a/index.md"), "../../");
    }

    #[test]
    fn renders_nested_page_with_hashed_style() {
        let temp = tempdir().unwrap();
        let file = content_file(
            temp.path(),
            "posts/hello/index.md",
            b"---\ntitle: Hello\nbodyClass: post\n---\n[home]({{root}}index.html)\n",
        );
        let mut ctx = BuildContext::new(BuildOptions::default());
        ctx.manifest.insert(STYLE_CSS, "static/css/style.0123456789.css");

        let output = transform(&temp.path().join("src")).process(&ctx, &file).unwrap();

        let dest = temp.path().join("out/posts/hello/index.html");
        assert_eq!(output.outputs, vec![dest.clone()]);
        let html = fs::read_to_string(dest).unwrap();
        assert!(html.contains("<title>Hello</title>"));
        assert!(html.contains(r#"<body class="post">"#));
        assert!(html.contains(r#"href="../../static/css/style.0123456789.css""#));
        assert!(html.contains(r#"<a href="../../">home</a>"#));
        assert!(html.contains("googletagmanager.com/gtag/js?id=G-TEST"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn index_gets_listings_and_home_class() {
        let temp = tempdir().unwrap();
        content_file(temp.path(), "posts/first/index.md", b"---\ntitle: First\n---\n");
        let file = content_file(temp.path(), "index.md", b"<ul>\n{{postsList}}\n</ul>\n");

        transform(&temp.path().join("src"))
            .process(&BuildContext::new(BuildOptions::default()), &file)
            .unwrap();

        let html = fs::read_to_string(temp.path().join("out/index.html")).unwrap();
        assert!(html.contains(r#"<body class="home">"#));
        assert!(html.contains(r#"<li><a href="posts/first/">First</a></li>"#));
        assert!(html.contains(r#"href="static/css/style.css""#));
    }

    #[test]
    fn injects_dev_reload() {
        let temp = tempdir().unwrap();
        let file = content_file(temp.path(), "about.md", b"About\n");
        let ctx = BuildContext::new(BuildOptions {
            dev_reload: Some("<script src=\"/__reload.js\"></script>".to_string()),
            ..Default::default()
        });

        transform(&temp.path().join("src")).process(&ctx, &file).unwrap();

        let html = fs::read_to_string(temp.path().join("out/about.html")).unwrap();
        assert!(html.contains("<script src=\"/__reload.js\"></script>"));
    }

    #[test]
    fn malformed_front_matter_is_a_parse_error() {
        let temp = tempdir().unwrap();
        let file = content_file(temp.path(), "broken.md", b"---\ntitle: [unclosed\n---\nbody\n");

        let ctx = BuildContext::new(BuildOptions::default());
        let result = transform(temp.path()).process(&ctx, &file);

        assert!(matches!(result, Err(TransformError::Parse(_))));
    }
}

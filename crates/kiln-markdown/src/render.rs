//! Markdown to HTML rendering.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

/// Hook for replacing the markup of markdown images.
pub trait ImageRenderer {
    /// Markup for an image, or `None` to keep the plain `<img>` tag.
    fn render_image(&self, src: &str, title: &str, alt: &str) -> Option<String>;
}

/// An image whose alt text is still being collected.
struct PendingImage<'a> {
    events: Vec<Event<'a>>,
    src: CowStr<'a>,
    title: CowStr<'a>,
    alt: String,
}

/// Render markdown to HTML.
///
/// Link targets go through [`rewrite_href`]. When an image renderer is given,
/// every image is offered to it and replaced by its markup.
pub fn render_markdown(content: &str, images: Option<&dyn ImageRenderer>) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(content, options);

    let mut events: Vec<Event<'_>> = Vec::new();
    let mut pending: Option<PendingImage<'_>> = None;

    for event in parser {
        if let Some(mut image) = pending.take() {
            if let Event::End(TagEnd::Image) = event {
                image.events.push(event);
                let markup =
                    images.and_then(|r| r.render_image(&image.src, &image.title, &image.alt));
                match markup {
                    Some(markup) => events.push(Event::InlineHtml(markup.into())),
                    None => events.extend(image.events),
                }
            } else {
                if let Event::Text(text) | Event::Code(text) = &event {
                    image.alt.push_str(text);
                }
                image.events.push(event);
                pending = Some(image);
            }
            continue;
        }

        match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => events.push(Event::Start(Tag::Link {
                link_type,
                dest_url: rewrite_href(&dest_url).into(),
                title,
                id,
            })),

            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) if images.is_some() => {
                pending = Some(PendingImage {
                    events: vec![Event::Start(Tag::Image {
                        link_type,
                        dest_url: dest_url.clone(),
                        title: title.clone(),
                        id,
                    })],
                    src: dest_url,
                    title,
                    alt: String::new(),
                });
            }

            other => events.push(other),
        }
    }

    if let Some(image) = pending {
        events.extend(image.events);
    }

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    html_output
}

/// Make a link target relative to the site root prefix.
///
/// A single leading `/` is dropped so the page's root prefix can be put in
/// front of it, and a trailing `index.html` is dropped so links point at
/// directories.
pub fn rewrite_href(href: &str) -> String {
    let href = match href.strip_prefix('/') {
        Some(rest) if !rest.starts_with('/') => rest,
        _ => href,
    };

    href.strip_suffix("index.html").unwrap_or(href).to_string()
}

//! HTML gallery for annotated pages.
//!
//! The gallery is one self-contained document: inline CSS, a few lines of
//! vanilla JavaScript, and one `<figure>` per page. Only the first page is
//! visible; prev/next buttons (and the arrow keys) step through the rest,
//! wrapping at both ends, with a `current / total` counter.
//!
//! Markup is generated with maud, so every interpolated value is escaped.

use crate::output::AnnotatedPage;
use maud::{html, Markup, PreEscaped, DOCTYPE};

/// One page as the gallery shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryEntry {
    pub id: String,
    pub page_num: usize,
    /// Static URL or `data:` URI.
    pub src: String,
    pub width: u32,
    pub height: u32,
}

impl GalleryEntry {
    /// Same page, different image source (used for inline data URIs).
    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = src.into();
        self
    }
}

impl From<&AnnotatedPage> for GalleryEntry {
    fn from(page: &AnnotatedPage) -> Self {
        Self {
            id: page.id.clone(),
            page_num: page.page_num,
            src: page.url.clone(),
            width: page.width,
            height: page.height,
        }
    }
}

const STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; background: #2b2b2b; color: #eee; }
header { padding: 0.75rem 1rem; display: flex; align-items: center; gap: 1rem; }
header h1 { font-size: 1.1rem; margin: 0; flex: 1; }
main { display: flex; justify-content: center; padding: 1rem; }
figure { margin: 0; text-align: center; }
figure img { max-width: 90vw; max-height: 80vh; height: auto; background: #fff; box-shadow: 0 2px 12px #000a; }
figcaption { margin-top: 0.5rem; font-size: 0.85rem; color: #aaa; }
button { font-size: 1rem; padding: 0.3rem 0.9rem; cursor: pointer; }
.empty, .error { margin: 4rem auto; max-width: 36rem; text-align: center; }
.error p { color: #f88; }
"#;

const SCRIPT: &str = r#"
(function () {
  var slides = document.querySelectorAll('figure.slide');
  var counter = document.getElementById('counter');
  var current = 0;
  function show(i) {
    var n = slides.length;
    current = ((i % n) + n) % n;
    slides.forEach(function (s, k) { s.hidden = k !== current; });
    counter.textContent = (current + 1) + ' / ' + n;
  }
  document.getElementById('prev').addEventListener('click', function () { show(current - 1); });
  document.getElementById('next').addEventListener('click', function () { show(current + 1); });
  document.addEventListener('keydown', function (e) {
    if (e.key === 'ArrowLeft') show(current - 1);
    if (e.key === 'ArrowRight') show(current + 1);
  });
  show(0);
})();
"#;

fn page_shell(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body { (body) }
        }
    }
    .into_string()
}

/// Render the carousel for `entries`, in the order given.
///
/// An empty slice renders an empty-state page rather than failing.
pub fn render_gallery(entries: &[GalleryEntry], title: &str) -> String {
    if entries.is_empty() {
        return page_shell(
            title,
            html! {
                header { h1 { (title) } }
                div.empty { p { "No pages to preview" } }
            },
        );
    }

    let total = entries.len();
    page_shell(
        title,
        html! {
            header {
                h1 { (title) }
                button #prev type="button" aria-label="Previous page" { "‹" }
                span #counter { "1 / " (total) }
                button #next type="button" aria-label="Next page" { "›" }
            }
            main {
                @for (i, entry) in entries.iter().enumerate() {
                    figure.slide id=(entry.id) data-page=(entry.page_num) hidden[i != 0] {
                        img src=(entry.src)
                            alt={ "Page " (entry.page_num) }
                            width=(entry.width)
                            height=(entry.height);
                        figcaption { "Page " (entry.page_num) }
                    }
                }
            }
            script { (PreEscaped(SCRIPT)) }
        },
    )
}

/// User-facing page for a failed preview.
pub fn render_error_page(message: &str) -> String {
    page_shell(
        "Preview failed",
        html! {
            div.error {
                h1 { "Preview failed" }
                p { (message) }
            }
        },
    )
}

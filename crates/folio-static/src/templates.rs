//! Template engine for rendering site pages.

use std::fmt::Write;

use minijinja::{AutoEscape, Environment, Error, ErrorKind, Output, State, Value};
use serde::Serialize;

use folio_content::escape_html;

use crate::assembler::{ListingEntry, PageLink, TagLink};

/// Site-wide values shared by every template.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub title: String,
    pub base_url: String,
    pub description: Option<String>,
    pub language: String,
}

/// A table of contents entry.
#[derive(Debug, Clone, Serialize)]
pub struct TocItem {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

/// Context for `page.html`.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext<'a> {
    pub site: &'a SiteContext,
    pub title: String,
    pub description: Option<String>,
    /// Human-readable date
    pub date: Option<String>,
    /// RFC 3339 date for `<time datetime>`
    pub date_iso: Option<String>,
    pub draft: bool,
    pub tags: Vec<TagLink>,
    pub toc: Vec<TocItem>,
    /// Rendered content HTML
    pub content: String,
    pub prev: Option<PageLink>,
    pub next: Option<PageLink>,
    /// Unrecognized front-matter keys
    pub params: Value,
    /// Client-side diagram script, when the page has diagrams to draw
    pub diagram_script: Option<String>,
}

/// Context for `list.html`.
#[derive(Debug, Clone, Serialize)]
pub struct ListingContext<'a> {
    pub site: &'a SiteContext,
    pub title: String,
    pub entries: &'a [ListingEntry],
    pub number: usize,
    pub total: usize,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagSummary {
    pub name: String,
    pub url: String,
    pub count: usize,
}

/// Context for `tags.html`.
#[derive(Debug, Clone, Serialize)]
pub struct TagsContext<'a> {
    pub site: &'a SiteContext,
    pub title: String,
    pub tags: Vec<TagSummary>,
}

/// Template engine using minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with the built-in templates.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_formatter(html_formatter);

        env.add_template("base.html", BASE_TEMPLATE)
            .expect("Failed to add base template");
        env.add_template("page.html", PAGE_TEMPLATE)
            .expect("Failed to add page template");
        env.add_template("list.html", LIST_TEMPLATE)
            .expect("Failed to add list template");
        env.add_template("tags.html", TAGS_TEMPLATE)
            .expect("Failed to add tags template");

        Self { env }
    }

    pub fn render_page(&self, context: &PageContext<'_>) -> Result<String, minijinja::Error> {
        self.env.get_template("page.html")?.render(context)
    }

    pub fn render_listing(&self, context: &ListingContext<'_>) -> Result<String, minijinja::Error> {
        self.env.get_template("list.html")?.render(context)
    }

    pub fn render_tags(&self, context: &TagsContext<'_>) -> Result<String, minijinja::Error> {
        self.env.get_template("tags.html")?.render(context)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// HTML auto-escaping that leaves `/` alone so URLs stay readable.
fn html_formatter(out: &mut Output<'_>, state: &State<'_, '_>, value: &Value) -> Result<(), Error> {
    if matches!(state.auto_escape(), AutoEscape::Html)
        && !value.is_safe()
        && !value.is_undefined()
        && !value.is_none()
    {
        out.write_str(&escape_html(&value.to_string()))
            .map_err(|_| Error::from(ErrorKind::WriteFailure))
    } else {
        minijinja::escape_formatter(out, state, value)
    }
}

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="{{ site.language }}">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% if title and title != site.title %}{{ title }} - {% endif %}{{ site.title }}</title>
  {% if description %}<meta name="description" content="{{ description }}">
  {% elif site.description %}<meta name="description" content="{{ site.description }}">
  {% endif %}<link rel="stylesheet" href="{{ site.base_url }}assets/main.css">
</head>
<body>
  <header class="site-header">
    <a href="{{ site.base_url }}" class="site-title">{{ site.title }}</a>
    <nav class="site-nav"><a href="{{ site.base_url }}tags/">Tags</a></nav>
  </header>
  <main class="main">
    {% block content %}{% endblock %}
  </main>
  {% if diagram_script %}
  <script src="{{ diagram_script }}"></script>
  <script>mermaid.initialize({ startOnLoad: true });</script>
  {% endif %}
</body>
</html>"##;

const PAGE_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<article class="post{% if draft %} draft{% endif %}">
  <header class="post-header">
    <h1 class="post-title">{{ title }}</h1>
    <div class="post-meta">
      {% if date %}<time datetime="{{ date_iso }}">{{ date }}</time>{% endif %}
      {% if draft %}<span class="draft-badge">Draft</span>{% endif %}
    </div>
    {% if tags %}
    <ul class="post-tags">
    {% for tag in tags %}
      <li>{% if tag.url %}<a href="{{ tag.url }}">{{ tag.name }}</a>{% else %}{{ tag.name }}{% endif %}</li>
    {% endfor %}
    </ul>
    {% endif %}
  </header>

  {% if toc %}
  <nav class="toc">
    <h2>Contents</h2>
    <ul>
    {% for entry in toc %}
      <li class="toc-level-{{ entry.level }}"><a href="#{{ entry.id }}">{{ entry.title }}</a></li>
    {% endfor %}
    </ul>
  </nav>
  {% endif %}

  <div class="content">
    {{ content | safe }}
  </div>

  {% if prev or next %}
  <nav class="post-nav">
    {% if prev %}<a class="prev" rel="prev" href="{{ prev.url }}">&laquo; {{ prev.title }}</a>{% endif %}
    {% if next %}<a class="next" rel="next" href="{{ next.url }}">{{ next.title }} &raquo;</a>{% endif %}
  </nav>
  {% endif %}
</article>
{% endblock %}"##;

const LIST_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<section class="listing">
  <h1>{{ title }}</h1>
  {% if entries %}
  <ul class="entries">
  {% for entry in entries %}
    <li class="entry">
      <a href="{{ entry.url }}">{{ entry.title }}</a>
      {% if entry.date %}<time>{{ entry.date }}</time>{% endif %}
      {% if entry.description %}<p>{{ entry.description }}</p>{% endif %}
    </li>
  {% endfor %}
  </ul>
  {% else %}
  <p class="empty">Nothing published yet.</p>
  {% endif %}

  {% if total > 1 %}
  <nav class="pagination">
    {% if prev_url %}<a rel="prev" href="{{ prev_url }}">&laquo; Newer</a>{% endif %}
    <span>Page {{ number }} of {{ total }}</span>
    {% if next_url %}<a rel="next" href="{{ next_url }}">Older &raquo;</a>{% endif %}
  </nav>
  {% endif %}
</section>
{% endblock %}"##;

const TAGS_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<section class="tags">
  <h1>{{ title }}</h1>
  <ul class="tag-cloud">
  {% for tag in tags %}
    <li><a href="{{ tag.url }}">{{ tag.name }}</a> <sup>{{ tag.count }}</sup></li>
  {% endfor %}
  </ul>
</section>
{% endblock %}"##;

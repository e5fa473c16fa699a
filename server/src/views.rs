//! HTML rendering with liquid templates.
//!
//! Each [`Page`] has a body template which is rendered first; its output is
//! then placed inside the shared layout together with the page title and the
//! pending flash message. Templates are compiled into the binary and parsed
//! once at startup.
//!
//! Liquid does not escape output on its own, so every template pipes user
//! supplied text through the `escape` filter.

use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::types::Flash;

const LAYOUT: &str = include_str!("../templates/layout.liquid");
const LISTS: &str = include_str!("../templates/lists.liquid");
const NEW_LIST: &str = include_str!("../templates/new_list.liquid");
const LIST: &str = include_str!("../templates/list.liquid");
const EDIT_LIST: &str = include_str!("../templates/edit_list.liquid");
const NOT_FOUND: &str = include_str!("../templates/not_found.liquid");

/// Errors raised while parsing or rendering templates.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A template failed to parse.
    #[error("failed to parse template '{template}': {message}")]
    Parse { template: &'static str, message: String },

    /// View data could not be converted into template globals.
    #[error("failed to build context for '{template}': {message}")]
    Context { template: &'static str, message: String },

    /// A template failed to render.
    #[error("failed to render template '{template}': {message}")]
    Render { template: &'static str, message: String },
}

/// The pages the server can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Lists,
    NewList,
    List,
    EditList,
    NotFound,
}

impl Page {
    /// Template name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Lists => "lists",
            Self::NewList => "new_list",
            Self::List => "list",
            Self::EditList => "edit_list",
            Self::NotFound => "not_found",
        }
    }
}

/// Globals handed to the layout template.
#[derive(Debug, Serialize)]
struct LayoutContext<'a> {
    title: &'a str,
    content: &'a str,
    flash: Option<&'a Flash>,
}

/// Parsed templates for every page plus the layout.
pub struct Views {
    layout: liquid::Template,
    lists: liquid::Template,
    new_list: liquid::Template,
    list: liquid::Template,
    edit_list: liquid::Template,
    not_found: liquid::Template,
}

impl Views {
    /// Parses the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Parse`] if any template is malformed.
    pub fn new() -> Result<Self, ViewError> {
        let parser = liquid::ParserBuilder::with_stdlib()
            .build()
            .map_err(|e| ViewError::Parse {
                template: "parser",
                message: e.to_string(),
            })?;

        let parse = |template: &'static str, source: &str| {
            parser.parse(source).map_err(|e| ViewError::Parse {
                template,
                message: e.to_string(),
            })
        };

        Ok(Self {
            layout: parse("layout", LAYOUT)?,
            lists: parse(Page::Lists.name(), LISTS)?,
            new_list: parse(Page::NewList.name(), NEW_LIST)?,
            list: parse(Page::List.name(), LIST)?,
            edit_list: parse(Page::EditList.name(), EDIT_LIST)?,
            not_found: parse(Page::NotFound.name(), NOT_FOUND)?,
        })
    }

    fn template(&self, page: Page) -> &liquid::Template {
        match page {
            Page::Lists => &self.lists,
            Page::NewList => &self.new_list,
            Page::List => &self.list,
            Page::EditList => &self.edit_list,
            Page::NotFound => &self.not_found,
        }
    }

    /// Renders `page` with `data`, wrapped in the layout.
    pub fn render(
        &self,
        page: Page,
        title: &str,
        data: &impl Serialize,
        flash: Option<&Flash>,
    ) -> Result<String, ViewError> {
        let globals = to_globals(page.name(), data)?;
        let content = self
            .template(page)
            .render(&globals)
            .map_err(|e| ViewError::Render {
                template: page.name(),
                message: e.to_string(),
            })?;

        let layout_globals = to_globals(
            "layout",
            &LayoutContext {
                title,
                content: &content,
                flash,
            },
        )?;
        let html = self
            .layout
            .render(&layout_globals)
            .map_err(|e| ViewError::Render {
                template: "layout",
                message: e.to_string(),
            })?;

        trace!(page = page.name(), bytes = html.len(), "Rendered page");
        Ok(html)
    }
}

impl std::fmt::Debug for Views {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Views").finish_non_exhaustive()
    }
}

fn to_globals(template: &'static str, data: &impl Serialize) -> Result<liquid::Object, ViewError> {
    liquid::to_object(data).map_err(|e| ViewError::Context {
        template,
        message: e.to_string(),
    })
}

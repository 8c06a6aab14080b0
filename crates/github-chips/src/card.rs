//! Declarative card model.
//!
//! A [`Card`] is a plain value: a header plus ordered sections of widgets.
//! Renderers build one per invocation and hand it to the host boundary,
//! which converts it into whatever the host platform expects. Construction
//! methods consume and return `self`, so a finished card is never mutated.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardHeader {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
}

impl CardHeader {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            image_url: image_url.into(),
        }
    }
}

/// How a link opens on the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenAs {
    #[default]
    FullSize,
    Overlay,
}

/// What the host does once an overlay closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnClose {
    #[default]
    Nothing,
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenLink {
    pub url: String,
    pub open_as: OpenAs,
    pub on_close: OnClose,
}

impl OpenLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            open_as: OpenAs::default(),
            on_close: OnClose::default(),
        }
    }

    /// Open in an overlay and reload the host surface when it closes. Used
    /// for the OAuth authorization page.
    pub fn overlay_reload(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            open_as: OpenAs::Overlay,
            on_close: OnClose::Reload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    /// Labelled value, optionally clickable.
    KeyValue {
        label: String,
        content: String,
        link: Option<OpenLink>,
    },
    Paragraph { text: String },
    /// Button that opens a URL.
    LinkButton { text: String, link: OpenLink },
    /// Button that invokes a named handler on the add-on.
    ActionButton { text: String, function: String },
}

impl Widget {
    pub fn key_value(label: impl Into<String>, content: impl Into<String>) -> Self {
        Widget::KeyValue {
            label: label.into(),
            content: content.into(),
            link: None,
        }
    }

    pub fn key_value_link(
        label: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Widget::KeyValue {
            label: label.into(),
            content: content.into(),
            link: Some(OpenLink::new(url)),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Widget::Paragraph { text: text.into() }
    }

    pub fn link_button(text: impl Into<String>, link: OpenLink) -> Self {
        Widget::LinkButton {
            text: text.into(),
            link,
        }
    }

    pub fn action_button(text: impl Into<String>, function: impl Into<String>) -> Self {
        Widget::ActionButton {
            text: text.into(),
            function: function.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub widgets: Vec<Widget>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// A section holding exactly one widget.
    pub fn of(widget: Widget) -> Self {
        Self {
            widgets: vec![widget],
        }
    }

    pub fn with(mut self, widget: Widget) -> Self {
        self.widgets.push(widget);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub header: CardHeader,
    pub sections: Vec<Section>,
}

impl Card {
    pub fn new(header: CardHeader) -> Self {
        Self {
            header,
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Append `section` only when `cond` holds.
    pub fn with_section_if(self, cond: bool, section: impl FnOnce() -> Section) -> Self {
        if cond {
            self.with_section(section())
        } else {
            self
        }
    }

    /// All widgets in order, across sections.
    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.sections.iter().flat_map(|s| s.widgets.iter())
    }

    /// Content of the first key-value widget with `label`.
    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.widgets().find_map(|w| match w {
            Widget::KeyValue {
                label: l, content, ..
            } if l == label => Some(content.as_str()),
            _ => None,
        })
    }
}

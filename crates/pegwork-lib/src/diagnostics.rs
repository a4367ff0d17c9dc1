//! Builder-pattern printer for rendering parse failures with source
//! context.
//!
//! The plain `Line L, column C:` tree is `ParseError`'s `Display`; this
//! adds the annotated-snippet rendering the CLI shows when it has the
//! source at hand.

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use crate::engine::error::ParseError;

/// Builder for rendering a parse failure with various options.
pub struct ParseErrorPrinter<'e, 's> {
    error: &'e ParseError,
    source: Option<&'s str>,
    path: Option<&'s str>,
    colored: bool,
}

impl<'e, 's> ParseErrorPrinter<'e, 's> {
    pub fn new(error: &'e ParseError) -> Self {
        Self {
            error,
            source: None,
            path: None,
            colored: false,
        }
    }

    pub fn source(mut self, source: &'s str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn path(mut self, path: &'s str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let Some(source) = self.source else {
            return self.error.to_string();
        };

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        // The deepest point reached is where the annotation goes; the
        // shallower failures stay in the Display tree.
        let deepest = self.error.deepest();
        let range = annotation_range(deepest.offset, source.len());

        let mut snippet = Snippet::source(source).line_start(1).annotation(
            AnnotationKind::Primary
                .span(range)
                .label(&deepest.message),
        );
        if let Some(path) = self.path {
            snippet = snippet.path(path);
        }

        let report: Vec<Group> = vec![Level::ERROR.primary_title(&self.error.message).element(snippet)];
        renderer.render(&report).to_string()
    }
}

fn annotation_range(offset: usize, limit: usize) -> std::ops::Range<usize> {
    offset..(offset + 1).min(limit)
}

impl ParseError {
    pub fn printer(&self) -> ParseErrorPrinter<'_, '_> {
        ParseErrorPrinter::new(self)
    }
}

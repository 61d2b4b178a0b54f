//! Render surface abstraction.
//!
//! The host owns the rendering container the overlay draws into. The engine
//! only needs an absolute-layout container it can add labels to, measure, move
//! horizontally and remove from. [`MemorySurface`] is an in-memory container
//! used by headless hosts and tests.

use rustc_hash::FxHashMap;
use std::fmt;
use unicode_width::UnicodeWidthStr;

/// Identifier the engine assigns to each element it puts on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u64);

impl ElementId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a surface needs to create a label.
#[derive(Debug, Clone, Copy)]
pub struct Label<'a> {
    pub text: &'a str,
    /// Initial left edge, normally the surface width (just off screen)
    pub left: i32,
    /// Top edge of the lane
    pub top: i32,
    pub height: u32,
    pub font_size: f32,
    /// Horizontal padding on each side of the text
    pub padding: u32,
}

/// A host rendering container with absolute positioning.
///
/// Implementations are driven from a single UI thread and need not be `Sync`.
pub trait RenderSurface {
    /// Add a label. Returns `false` if the surface refuses it, in which case
    /// nothing was attached.
    fn attach(&mut self, id: ElementId, label: &Label<'_>) -> bool;

    /// Rendered width of an attached label, including padding.
    fn measure(&self, id: ElementId) -> Option<u32>;

    /// Move an attached label horizontally.
    fn set_left(&mut self, id: ElementId, left: i32);

    /// Remove a label. Returns `false` if it was not attached.
    fn detach(&mut self, id: ElementId) -> bool;

    /// Number of labels currently attached.
    fn child_count(&self) -> usize;
}

/// Text width measurement at a given font size.
pub trait TextMeasure {
    /// Width of `text` in pixels, excluding padding.
    fn text_width(&self, text: &str, font_size: f32) -> u32;
}

/// Measures text by its Unicode display width.
///
/// Each terminal column is `column_em` of the font size wide, so wide (CJK)
/// characters take two columns.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMeasure {
    pub column_em: f32,
}

impl Default for ColumnMeasure {
    fn default() -> Self {
        Self { column_em: 0.5 }
    }
}

impl TextMeasure for ColumnMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> u32 {
        let columns = text.width() as f32;
        (columns * font_size * self.column_em).ceil() as u32
    }
}

/// A label attached to a [`MemorySurface`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceChild {
    pub text: String,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl SurfaceChild {
    /// Whether any part of the label lies within `0..surface_width`.
    pub fn is_visible(&self, surface_width: u32) -> bool {
        let right = i64::from(self.left) + i64::from(self.width);
        right > 0 && i64::from(self.left) < i64::from(surface_width)
    }
}

/// In-memory absolute-layout container.
#[derive(Debug, Default)]
pub struct MemorySurface<M = ColumnMeasure> {
    children: FxHashMap<ElementId, SurfaceChild>,
    measure: M,
    capacity: Option<usize>,
}

impl MemorySurface<ColumnMeasure> {
    pub fn new() -> Self {
        Self::with_measure(ColumnMeasure::default())
    }
}

impl<M: TextMeasure> MemorySurface<M> {
    pub fn with_measure(measure: M) -> Self {
        Self {
            children: FxHashMap::default(),
            measure,
            capacity: None,
        }
    }

    /// Refuse attachments once `capacity` labels are on the surface.
    pub fn with_capacity_limit(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn child(&self, id: ElementId) -> Option<&SurfaceChild> {
        self.children.get(&id)
    }

    /// Attached labels in attachment order.
    pub fn children(&self) -> Vec<(ElementId, &SurfaceChild)> {
        let mut children: Vec<_> = self.children.iter().map(|(id, c)| (*id, c)).collect();
        children.sort_by_key(|(id, _)| *id);
        children
    }
}

impl<M: TextMeasure> RenderSurface for MemorySurface<M> {
    fn attach(&mut self, id: ElementId, label: &Label<'_>) -> bool {
        if self.children.contains_key(&id) {
            return false;
        }
        if self.capacity.is_some_and(|cap| self.children.len() >= cap) {
            return false;
        }

        let width = self
            .measure
            .text_width(label.text, label.font_size)
            .saturating_add(label.padding.saturating_mul(2));
        self.children.insert(
            id,
            SurfaceChild {
                text: label.text.to_string(),
                left: label.left,
                top: label.top,
                width,
                height: label.height,
            },
        );
        true
    }

    fn measure(&self, id: ElementId) -> Option<u32> {
        self.children.get(&id).map(|c| c.width)
    }

    fn set_left(&mut self, id: ElementId, left: i32) {
        if let Some(child) = self.children.get_mut(&id) {
            child.left = left;
        }
    }

    fn detach(&mut self, id: ElementId) -> bool {
        self.children.remove(&id).is_some()
    }

    fn child_count(&self) -> usize {
        self.children.len()
    }
}

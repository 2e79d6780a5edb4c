#![forbid(unsafe_code)]

//! Scroll state for fixed-height rows.
//!
//! The viewport only knows the scroll offset (in items), its height and the
//! rows per item. Every derived value (visible range, marker row, which item
//! sits under a pointer row) is computed from those on demand.

use std::ops::Range;

/// Scroll position over a list of fixed-height items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// First visible item.
    offset: usize,
    /// Height in rows.
    height: u16,
    /// Rows per item (never zero).
    item_height: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Viewport {
    /// Create a zero-height viewport at the top.
    #[must_use]
    pub fn new(item_height: u16) -> Self {
        Self {
            offset: 0,
            height: 0,
            item_height: item_height.max(1),
        }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[must_use]
    pub fn item_height(&self) -> u16 {
        self.item_height
    }

    pub fn set_height(&mut self, height: u16) {
        self.height = height;
    }

    /// Items that fit completely.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        usize::from(self.height / self.item_height)
    }

    /// Items at least partly on screen, out of `len`.
    #[must_use]
    pub fn visible_range(&self, len: usize) -> Range<usize> {
        if len == 0 || self.height == 0 {
            return 0..0;
        }
        let rows = usize::from(self.height);
        let per = usize::from(self.item_height);
        let count = rows.div_ceil(per);
        let start = self.offset.min(len);
        start..(start + count).min(len)
    }

    /// Whether item `index` is completely on screen.
    #[must_use]
    pub fn is_fully_visible(&self, index: usize) -> bool {
        index >= self.offset && index < self.offset + self.visible_count()
    }

    /// Scroll the minimum amount that brings `index` fully on screen.
    ///
    /// Returns the new offset, or `None` if the item was already visible
    /// and nothing moved.
    pub fn reveal(&mut self, index: usize) -> Option<usize> {
        if self.is_fully_visible(index) {
            return None;
        }
        let visible = self.visible_count().max(1);
        let offset = if index < self.offset {
            index
        } else {
            index + 1 - visible
        };
        if offset == self.offset {
            return None;
        }
        self.offset = offset;
        Some(offset)
    }

    /// Scroll by `delta` items, clamped to `[0, len - visible_count]`.
    pub fn scroll(&mut self, delta: i32, len: usize) {
        if len == 0 {
            self.offset = 0;
            return;
        }
        let max_offset = if self.visible_count() > 0 {
            len.saturating_sub(self.visible_count())
        } else {
            len.saturating_sub(1)
        };
        let new_offset = (self.offset as i64 + i64::from(delta))
            .max(0)
            .min(max_offset as i64);
        self.offset = new_offset as usize;
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    /// Item under viewport row `row` (0 = top edge).
    #[must_use]
    pub fn item_at_row(&self, row: u16) -> usize {
        self.offset + usize::from(row / self.item_height)
    }

    /// Absolute row where the boundary marker after `displayed` items sits.
    #[must_use]
    pub fn marker_row(&self, displayed: usize) -> usize {
        displayed.saturating_mul(usize::from(self.item_height))
    }

    /// Whether a marker row lies on screen or within `margin` rows below it.
    #[must_use]
    pub fn is_row_near(&self, row: usize, margin: u16) -> bool {
        let top = self.offset.saturating_mul(usize::from(self.item_height));
        let bottom = top + usize::from(self.height) + usize::from(margin);
        self.height > 0 && row >= top && row < bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(height: u16) -> Viewport {
        let mut v = Viewport::new(1);
        v.set_height(height);
        v
    }

    #[test]
    fn visible_range_is_clamped() {
        let v = viewport(10);
        assert_eq!(v.visible_range(100), 0..10);
        assert_eq!(v.visible_range(4), 0..4);
        assert_eq!(v.visible_range(0), 0..0);
        assert_eq!(viewport(0).visible_range(100), 0..0);
    }

    #[test]
    fn partial_rows_count_as_visible() {
        let mut v = Viewport::new(3);
        v.set_height(10);
        assert_eq!(v.visible_count(), 3);
        assert_eq!(v.visible_range(100), 0..4);
    }

    #[test]
    fn reveal_is_noop_inside_viewport() {
        let mut v = viewport(10);
        assert_eq!(v.reveal(0), None);
        assert_eq!(v.reveal(9), None);
        assert_eq!(v.offset(), 0);
    }

    #[test]
    fn reveal_below_aligns_bottom() {
        let mut v = viewport(10);
        assert_eq!(v.reveal(10), Some(1));
        assert!(v.is_fully_visible(10));
        assert_eq!(v.reveal(25), Some(16));
    }

    #[test]
    fn reveal_above_aligns_top() {
        let mut v = viewport(10);
        v.scroll(40, 100);
        assert_eq!(v.reveal(3), Some(3));
        assert_eq!(v.offset(), 3);
    }

    #[test]
    fn reveal_in_zero_height_viewport_tracks_item() {
        let mut v = viewport(0);
        assert_eq!(v.reveal(5), Some(5));
        assert_eq!(v.reveal(5), None);
    }

    #[test]
    fn scroll_clamps_both_ends() {
        let mut v = viewport(10);
        v.scroll(-5, 100);
        assert_eq!(v.offset(), 0);
        v.scroll(500, 100);
        assert_eq!(v.offset(), 90);
        v.scroll(1, 0);
        assert_eq!(v.offset(), 0);
    }

    #[test]
    fn item_at_row_accounts_for_height_and_offset() {
        let mut v = Viewport::new(2);
        v.set_height(10);
        v.scroll(3, 100);
        assert_eq!(v.item_at_row(0), 3);
        assert_eq!(v.item_at_row(1), 3);
        assert_eq!(v.item_at_row(5), 5);
    }

    #[test]
    fn marker_nearness_uses_margin() {
        let v = viewport(10);
        assert!(v.is_row_near(v.marker_row(9), 0));
        assert!(!v.is_row_near(v.marker_row(12), 0));
        assert!(v.is_row_near(v.marker_row(12), 3));
        assert!(!viewport(0).is_row_near(0, 3));
    }
}

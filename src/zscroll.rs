//! Z window selection of a view.
//!
//! The window is rounded onto whole slices and kept inside the stack. When
//! the active view is linked, its window changes are broadcast as deltas;
//! the other linked views apply them without broadcasting again.

use std::cell::Cell;
use std::rc::Rc;

use wmm_ui::{Signal, Subscription};

use crate::constants::Z_FAST_STEP;
use crate::link::{LinkBus, ZLink};
use crate::model::{ViewId, ZRange};

/// `Math.round` semantics: halves round towards positive infinity.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Snap a requested `[low, high)` window onto slices of a stack of
/// `length` slices.
///
/// Inverted ends are swapped, the window spans at least one slice, and a
/// window running past the end is moved back inside while keeping its span.
pub fn round_selection(low: f64, high: f64, length: i64) -> ZRange {
    let (low, high) = if high < low { (high, low) } else { (low, high) };
    let distance = round_half_up(high - low).max(1);
    let mut start = round_half_up(low).max(0);
    let mut end = start + distance;
    if end > length {
        end = length;
        start = end - distance;
    }
    ZRange::new(start.max(0), end)
}

/// Window around slice `z` for a stack of `length` slices.
///
/// Keeps the current half-width `floor(len / 2)` on both sides of `z`,
/// cut at the ends of the stack, and always includes `z` itself.
pub fn window_around(current: ZRange, z: i64, length: i64) -> ZRange {
    let distance = current.len().max(0) / 2;
    let low = (z - distance).max(0);
    let high = (z + distance).min(length - 1);
    ZRange::new(low, high + 1)
}

/// Z window of one view.
pub struct ZRangeControl {
    view: ViewId,
    range: Signal<ZRange>,
    length: Rc<Cell<i64>>,
    linked: Rc<Cell<bool>>,
    active: Signal<Option<ViewId>>,
    bus: LinkBus<ZLink>,
    _link: Subscription,
}

impl ZRangeControl {
    /// `active` holds the id of the view receiving user input.
    pub fn new(
        view: ViewId,
        range: Signal<ZRange>,
        length: i64,
        linked: bool,
        active: Signal<Option<ViewId>>,
        bus: LinkBus<ZLink>,
    ) -> Self {
        let length = Rc::new(Cell::new(length));
        let linked = Rc::new(Cell::new(linked));

        let link = {
            let view = view.clone();
            let range = range.clone();
            let length = Rc::clone(&length);
            let linked = Rc::clone(&linked);
            let active = active.clone();
            bus.subscribe(move |event: &ZLink| {
                if event.origin == view || !linked.get() {
                    return;
                }
                if active.with(|a| a.as_ref() == Some(&view)) {
                    return;
                }
                let current = range.get();
                let next = round_selection(
                    (current.low + event.delta_low) as f64,
                    (current.high + event.delta_high) as f64,
                    length.get(),
                );
                log::trace!("🔗 {} follows z of {}: {:?}", view, event.origin, next);
                range.set(next);
            })
        };

        Self {
            view,
            range,
            length,
            linked,
            active,
            bus,
            _link: link,
        }
    }

    pub fn range(&self) -> &Signal<ZRange> {
        &self.range
    }

    pub fn get(&self) -> ZRange {
        self.range.get()
    }

    pub fn length(&self) -> i64 {
        self.length.get()
    }

    pub fn set_length(&self, length: i64) {
        self.length.set(length);
        let current = self.range.get();
        self.range.set(round_selection(
            current.low as f64,
            current.high as f64,
            length,
        ));
    }

    pub fn set_linked(&self, linked: bool) {
        self.linked.set(linked);
    }

    fn is_active(&self) -> bool {
        self.active.with(|a| a.as_ref() == Some(&self.view))
    }

    /// Select a window from user input. Returns whether it changed.
    pub fn select(&self, low: f64, high: f64) -> bool {
        let next = round_selection(low, high, self.length.get());
        let current = self.range.get();
        let delta_low = next.low - current.low;
        let delta_high = next.high - current.high;
        if delta_low == 0 && delta_high == 0 {
            return false;
        }
        if self.linked.get() && self.is_active() {
            self.bus.publish(&ZLink {
                origin: self.view.clone(),
                delta_low,
                delta_high,
            });
        }
        self.range.set(next)
    }

    /// Move the window by `slices`; shift skips several slices per step.
    pub fn scroll(&self, slices: i64, shift: bool) -> bool {
        let step = if shift { slices * Z_FAST_STEP } else { slices };
        let current = self.range.get();
        let span = current.len();
        let mut low = (current.low + step).max(0);
        if low + span > self.length.get() {
            low = self.length.get() - span;
        }
        self.select(low as f64, (low + span) as f64)
    }

    /// Centre the window on slice `z`; see [`window_around`].
    pub fn center_on(&self, z: i64) -> bool {
        let next = window_around(self.range.get(), z, self.length.get());
        self.select(next.low as f64, next.high as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_selection_swaps_and_rounds() {
        assert_eq!(round_selection(5.4, 2.6, 10), ZRange::new(3, 6));
        assert_eq!(round_selection(2.5, 2.5, 10), ZRange::new(3, 4));
    }

    #[test]
    fn test_round_selection_keeps_span_at_the_end() {
        assert_eq!(round_selection(8.0, 12.0, 10), ZRange::new(6, 10));
        assert_eq!(round_selection(-3.0, 1.0, 10), ZRange::new(0, 4));
        // A span longer than the stack is cut at zero
        assert_eq!(round_selection(0.0, 20.0, 10), ZRange::new(0, 10));
    }

    fn control(
        view: &str,
        linked: bool,
        active: &Signal<Option<ViewId>>,
        bus: &LinkBus<ZLink>,
    ) -> ZRangeControl {
        ZRangeControl::new(
            view.into(),
            Signal::new(ZRange::new(0, 2)),
            20,
            linked,
            active.clone(),
            bus.clone(),
        )
    }

    #[test]
    fn test_active_linked_view_drives_others() {
        let active = Signal::new(Some(ViewId::new("a")));
        let bus = LinkBus::new();
        let a = control("a", true, &active, &bus);
        let b = control("b", true, &active, &bus);
        let c = control("c", false, &active, &bus);

        assert!(a.select(4.0, 7.0));
        assert_eq!(a.get(), ZRange::new(4, 7));
        assert_eq!(b.get(), ZRange::new(4, 7));
        assert_eq!(c.get(), ZRange::new(0, 2));
    }

    #[test]
    fn test_inactive_view_does_not_broadcast() {
        let active = Signal::new(Some(ViewId::new("a")));
        let bus = LinkBus::new();
        let a = control("a", true, &active, &bus);
        let b = control("b", true, &active, &bus);

        b.select(10.0, 11.0);
        assert_eq!(b.get(), ZRange::new(10, 11));
        assert_eq!(a.get(), ZRange::new(0, 2));
    }

    #[test]
    fn test_scroll_with_shift_skips() {
        let active = Signal::new(None);
        let bus = LinkBus::new();
        let a = control("a", false, &active, &bus);
        a.scroll(1, false);
        assert_eq!(a.get(), ZRange::new(1, 3));
        a.scroll(1, true);
        assert_eq!(a.get(), ZRange::new(4, 6));
        a.scroll(100, false);
        assert_eq!(a.get(), ZRange::new(18, 20));
        a.scroll(-100, false);
        assert_eq!(a.get(), ZRange::new(0, 2));
    }

    #[test]
    fn test_center_on_keeps_half_width() {
        let active = Signal::new(None);
        let bus = LinkBus::new();
        let a = control("a", false, &active, &bus);
        a.select(0.0, 4.0);
        a.center_on(10);
        assert_eq!(a.get(), ZRange::new(8, 13));
        // Cut at the end of the stack
        a.center_on(19);
        assert_eq!(a.get(), ZRange::new(17, 20));
        a.center_on(0);
        assert_eq!(a.get(), ZRange::new(0, 2));
    }

    #[test]
    fn test_window_around_single_slice() {
        assert_eq!(window_around(ZRange::new(0, 1), 12, 20), ZRange::new(12, 13));
        assert_eq!(window_around(ZRange::new(4, 9), 12, 20), ZRange::new(10, 15));
    }
}

//! Window/value circular buffers (component I): a power-of-two ring
//! buffer of per-row values plus a sliding-frame view over it, backing
//! rolling/windowed aggregates (`AggKind::Rolling`).
//!
//! No teacher analogue implements this algorithm directly (spec.md §4.I
//! is new algorithmic work); the *shape* of the container — a small,
//! single-purpose generic type doing its own index arithmetic rather
//! than reaching for a crate — follows `tank-core/src/util.rs`'s
//! `EitherIterator`, the one other "plain generic container, no external
//! dependency" type in the teacher.
//!
//! Null handling in `min`/`max`/`average` follows spec.md §4.I's
//! "loop initializer is the type's MAX/MIN sentinel" note: a primitive
//! numeric type (one with a finite MAX/MIN) simply skips null cells when
//! scanning; a boxed type with no such sentinel (`rust_decimal::Decimal`
//! stands in for the spec's "big-decimal, no MAX/MIN constant" example)
//! can't represent "null compares as the extreme value" and so a null
//! anywhere in range makes the result null (it propagates). `minNL`/
//! `maxNL` don't need a sentinel at all: nulls-low is a direct ordering
//! fact (null is the smallest possible value), so `minNL` short-circuits
//! to null the instant one is seen, and `maxNL` just ignores nulls
//! outright, for every `Numeric` type alike.

use std::fmt;

/// Scalar element type a `RingBuffer`/`Window` can aggregate over.
pub trait Numeric: Copy + PartialOrd {
    fn zero() -> Self;
    fn add(self, other: Self) -> Self;
    fn to_f64(self) -> f64;
    /// Whether a divide-by-zero average should throw (`true`, integer
    /// family) or produce `NaN` (`false`, floating family).
    fn is_integral() -> bool;
    /// Whether this type has a finite MAX/MIN to seed a skip-nulls scan
    /// with; `false` means a null anywhere in range propagates through
    /// `min`/`max`.
    fn has_sentinel() -> bool;
}

macro_rules! impl_numeric_float {
    ($t:ty) => {
        impl Numeric for $t {
            fn zero() -> Self {
                0.0
            }
            fn add(self, other: Self) -> Self {
                self + other
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn is_integral() -> bool {
                false
            }
            fn has_sentinel() -> bool {
                true
            }
        }
    };
}

macro_rules! impl_numeric_int {
    ($t:ty) => {
        impl Numeric for $t {
            fn zero() -> Self {
                0
            }
            fn add(self, other: Self) -> Self {
                self + other
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn is_integral() -> bool {
                true
            }
            fn has_sentinel() -> bool {
                true
            }
        }
    };
}

impl_numeric_float!(f32);
impl_numeric_float!(f64);
impl_numeric_int!(i32);
impl_numeric_int!(i64);

impl Numeric for rust_decimal::Decimal {
    fn zero() -> Self {
        rust_decimal::Decimal::ZERO
    }
    fn add(self, other: Self) -> Self {
        self + other
    }
    fn to_f64(self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.to_f64().unwrap_or(f64::NAN)
    }
    fn is_integral() -> bool {
        false
    }
    fn has_sentinel() -> bool {
        // Arbitrary-precision decimal has no MAX/MIN constant wide
        // enough to act as a true sentinel, so default min/max propagate
        // nulls instead of skipping them.
        false
    }
}

/// Division by zero with a non-nullable, integral result type — an
/// evaluation-time error (spec.md §7.6), not a planning-time one, so it
/// carries no span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivideByZero;

impl fmt::Display for DivideByZero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "division by zero")
    }
}
impl std::error::Error for DivideByZero {}

/// A power-of-two circular buffer of `Option<T>` cells (`None` = a null
/// row value), doubling in place when full rather than being
/// monomorphized per element type.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn with_capacity(min_capacity: usize) -> Self {
        let cap = min_capacity.max(1).next_power_of_two();
        Self {
            data: vec![None; cap],
            head: 0,
            len: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.len
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Resets the buffer to hold exactly `v`.
    pub fn init(&mut self, v: Option<T>) {
        self.clear();
        self.add(v);
    }

    fn physical(&self, logical: usize) -> usize {
        (self.head + logical) & (self.data.len() - 1)
    }

    pub fn get(&self, i: usize) -> Option<&T> {
        debug_assert!(i < self.len, "RingBuffer index out of bounds");
        self.data[self.physical(i)].as_ref()
    }

    pub fn add(&mut self, v: Option<T>) {
        if self.len == self.data.len() {
            self.grow();
        }
        let pos = self.physical(self.len);
        self.data[pos] = v;
        self.len += 1;
    }

    fn grow(&mut self) {
        let old_cap = self.data.len();
        let new_cap = old_cap * 2;
        let mut new_data = vec![None; new_cap];
        for i in 0..self.len {
            new_data[i] = self.data[(self.head + i) & (old_cap - 1)].take();
        }
        self.data = new_data;
        self.head = 0;
    }

    pub fn remove_first(&mut self) -> Option<Option<T>> {
        if self.len == 0 {
            return None;
        }
        let v = self.data[self.head].take();
        self.head = (self.head + 1) & (self.data.len() - 1);
        self.len -= 1;
        Some(v)
    }

    pub fn remove(&mut self, n: usize) {
        for _ in 0..n.min(self.len) {
            self.remove_first();
        }
    }

    /// Non-null count over `[from, from + num)`.
    pub fn count(&self, from: usize, num: usize) -> usize {
        (from..from + num).filter(|&i| self.get(i).is_some()).count()
    }
}

impl<T: Numeric> RingBuffer<T> {
    pub fn sum(&self, from: usize, num: usize) -> T {
        let mut acc = T::zero();
        for i in from..from + num {
            if let Some(v) = self.get(i) {
                acc = acc.add(*v);
            }
        }
        acc
    }

    pub fn average(&self, from: usize, num: usize, nullable: bool) -> Result<Option<f64>, DivideByZero> {
        let count = self.count(from, num);
        if count == 0 {
            return Ok(if nullable {
                None
            } else if T::is_integral() {
                return Err(DivideByZero);
            } else {
                Some(f64::NAN)
            });
        }
        Ok(Some(self.sum(from, num).to_f64() / count as f64))
    }

    /// Nulls-high minimum: skips nulls for sentineled types, propagates
    /// (returns `None`) if any null is in range for boxed types with no
    /// sentinel.
    pub fn min(&self, from: usize, num: usize) -> Option<T> {
        if !T::has_sentinel() && (from..from + num).any(|i| self.get(i).is_none()) {
            return None;
        }
        self.scan(from, num, |acc, v| if v < acc { v } else { acc })
    }

    /// Nulls-high maximum: same propagation rule as `min`.
    pub fn max(&self, from: usize, num: usize) -> Option<T> {
        if !T::has_sentinel() && (from..from + num).any(|i| self.get(i).is_none()) {
            return None;
        }
        self.scan(from, num, |acc, v| if v > acc { v } else { acc })
    }

    /// Nulls-low minimum: null is the smallest possible value, so any
    /// null in range is immediately the answer.
    pub fn min_nl(&self, from: usize, num: usize) -> Option<T> {
        if (from..from + num).any(|i| self.get(i).is_none()) {
            return None;
        }
        self.scan(from, num, |acc, v| if v < acc { v } else { acc })
    }

    /// Nulls-low maximum: null never wins a maximum (it's the smallest
    /// possible value), so it's simply skipped, for every `T` alike.
    pub fn max_nl(&self, from: usize, num: usize) -> Option<T> {
        self.scan(from, num, |acc, v| if v > acc { v } else { acc })
    }

    fn scan(&self, from: usize, num: usize, pick: impl Fn(T, T) -> T) -> Option<T> {
        let mut best: Option<T> = None;
        for i in from..from + num {
            if let Some(&v) = self.get(i) {
                best = Some(match best {
                    Some(b) => pick(b, v),
                    None => v,
                });
            }
        }
        best
    }
}

/// A `RingBuffer` plus the row-relative frame `[start, end]` (both
/// inclusive) it currently covers, for rolling-window aggregates.
#[derive(Debug, Clone)]
pub struct Window<T> {
    buf: RingBuffer<T>,
    start: i64,
    end: i64,
}

impl<T: Clone> Window<T> {
    pub fn new() -> Self {
        Self {
            buf: RingBuffer::with_capacity(4),
            start: 0,
            end: -1,
        }
    }

    pub fn buffer(&self) -> &RingBuffer<T> {
        &self.buf
    }

    /// Appends the next row's value, extending `end` by one.
    pub fn push(&mut self, v: Option<T>) {
        self.buf.add(v);
        self.end += 1;
    }

    /// Shifts the covered frame to start at `frame_start`, dropping
    /// buffer entries that fell before it.
    pub fn advance_and_remove(&mut self, frame_start: i64) {
        if frame_start > self.start {
            let drop_n = (frame_start - self.start) as usize;
            self.buf.remove(drop_n);
            self.start += drop_n as i64;
        }
    }

    /// Shifts the frame start by one without removing anything — for a
    /// constantly-open (unbounded preceding) frame start.
    pub fn advance(&mut self) {
        self.start += 1;
    }

    fn clamp(&self, frame_start: i64, frame_end: i64) -> Option<(usize, usize)> {
        let fs = frame_start.max(self.start);
        let fe = frame_end.min(self.end);
        let num = fe - fs + 1;
        if num <= 0 {
            return None;
        }
        Some(((fs - self.start) as usize, num as usize))
    }
}

impl<T: Clone> Default for Window<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Numeric> Window<T> {
    pub fn frame_count(&self, frame_start: i64, frame_end: i64) -> usize {
        self.clamp(frame_start, frame_end)
            .map_or(0, |(from, num)| self.buf.count(from, num))
    }

    pub fn frame_sum(&self, frame_start: i64, frame_end: i64) -> T {
        self.clamp(frame_start, frame_end)
            .map_or(T::zero(), |(from, num)| self.buf.sum(from, num))
    }

    pub fn frame_average(&self, frame_start: i64, frame_end: i64, nullable: bool) -> Result<Option<f64>, DivideByZero> {
        match self.clamp(frame_start, frame_end) {
            Some((from, num)) => self.buf.average(from, num, nullable),
            None if nullable => Ok(None),
            None if T::is_integral() => Err(DivideByZero),
            None => Ok(Some(f64::NAN)),
        }
    }

    pub fn frame_min(&self, frame_start: i64, frame_end: i64) -> Option<T> {
        self.clamp(frame_start, frame_end).and_then(|(from, num)| self.buf.min(from, num))
    }

    pub fn frame_max(&self, frame_start: i64, frame_end: i64) -> Option<T> {
        self.clamp(frame_start, frame_end).and_then(|(from, num)| self.buf.max(from, num))
    }

    pub fn frame_min_nl(&self, frame_start: i64, frame_end: i64) -> Option<T> {
        self.clamp(frame_start, frame_end).and_then(|(from, num)| self.buf.min_nl(from, num))
    }

    pub fn frame_max_nl(&self, frame_start: i64, frame_end: i64) -> Option<T> {
        self.clamp(frame_start, frame_end).and_then(|(from, num)| self.buf.max_nl(from, num))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// spec.md §8's window-buffer scenario: a capacity-4 double buffer
    /// holding `[1.0, 2.0, null, 4.0]`.
    fn scenario_buffer() -> RingBuffer<f64> {
        let mut buf = RingBuffer::with_capacity(4);
        buf.add(Some(1.0));
        buf.add(Some(2.0));
        buf.add(None);
        buf.add(Some(4.0));
        buf
    }

    #[test]
    fn scenario_count_sum_average() {
        let buf = scenario_buffer();
        assert_eq!(buf.count(0, 4), 3);
        assert_eq!(buf.sum(0, 4), 7.0);
        assert_eq!(buf.average(0, 4, false).unwrap(), Some(7.0 / 3.0));
    }

    #[test]
    fn scenario_min_max_nulls_high_skip_nulls() {
        let buf = scenario_buffer();
        assert_eq!(buf.min(0, 4), Some(1.0));
        assert_eq!(buf.max(0, 4), Some(4.0));
    }

    #[test]
    fn scenario_min_nl_returns_null_when_any_present() {
        let buf = scenario_buffer();
        assert_eq!(buf.min_nl(0, 4), None);
    }

    #[test]
    fn max_nl_skips_nulls_like_max() {
        let buf = scenario_buffer();
        assert_eq!(buf.max_nl(0, 4), Some(4.0));
    }

    #[test]
    fn boxed_type_without_sentinel_propagates_null_through_min() {
        use rust_decimal::Decimal;
        let mut buf: RingBuffer<Decimal> = RingBuffer::with_capacity(4);
        buf.add(Some(Decimal::from(1)));
        buf.add(None);
        buf.add(Some(Decimal::from(3)));
        assert_eq!(buf.min(0, 3), None);
        assert_eq!(buf.max(0, 3), None);
        // NL variants never need a sentinel, so they still resolve.
        assert_eq!(buf.min_nl(0, 3), None); // a null is present -> nulls-low wins immediately
        assert_eq!(buf.max_nl(0, 3), Some(Decimal::from(3)));
    }

    #[test]
    fn average_of_empty_range_throws_for_non_nullable_integer() {
        let buf: RingBuffer<i32> = RingBuffer::with_capacity(4);
        assert_eq!(buf.average(0, 0, false), Err(DivideByZero));
        assert_eq!(buf.average(0, 0, true), Ok(None));
    }

    #[test]
    fn average_of_empty_range_is_nan_for_non_nullable_float() {
        let buf: RingBuffer<f64> = RingBuffer::with_capacity(4);
        assert!(buf.average(0, 0, false).unwrap().unwrap().is_nan());
    }

    #[test]
    fn grows_past_initial_capacity_preserving_order() {
        let mut buf: RingBuffer<i32> = RingBuffer::with_capacity(2);
        for i in 0..10 {
            buf.add(Some(i));
        }
        assert_eq!(buf.size(), 10);
        for i in 0..10 {
            assert_eq!(buf.get(i), Some(&i32::try_from(i).unwrap()));
        }
    }

    #[test]
    fn remove_first_advances_logical_window() {
        let mut buf: RingBuffer<i32> = RingBuffer::with_capacity(4);
        buf.add(Some(1));
        buf.add(Some(2));
        buf.add(Some(3));
        buf.remove(2);
        assert_eq!(buf.size(), 1);
        assert_eq!(buf.get(0), Some(&3));
    }

    #[test]
    fn window_frame_tracks_relative_offsets() {
        let mut w: Window<f64> = Window::new();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            w.push(Some(v));
        }
        // A 3-wide trailing frame [current-2, current]: at row index 4
        // (0-based), frame is rows 2..=4 -> [3.0, 4.0, 5.0].
        assert_eq!(w.frame_sum(2, 4), 12.0);
        assert_eq!(w.frame_count(2, 4), 3);
        w.advance_and_remove(2);
        assert_eq!(w.buffer().size(), 3);
        assert_eq!(w.frame_min(2, 4), Some(3.0));
        assert_eq!(w.frame_max(2, 4), Some(5.0));
    }

    #[test]
    fn window_frame_clamped_out_of_range_returns_empty_sentinels() {
        let mut w: Window<f64> = Window::new();
        w.push(Some(1.0));
        assert_eq!(w.frame_sum(-5, -3), 0.0);
        assert_eq!(w.frame_count(-5, -3), 0);
        assert_eq!(w.frame_min(-5, -3), None);
    }
}

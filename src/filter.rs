//! Row selection over batches and batch sequences.
//!
//! Filters never reorder rows. Over a sequence they are lazy: each batch is
//! filtered as it is pulled, and batches left empty are still yielded so that
//! batch boundaries stay aligned with the source.

use crate::error::Result;
use crate::record::{Batch, FlowRecord};
use chrono::{NaiveDate, NaiveDateTime};

/// Anything that can be truncated to a calendar day.
pub trait CalendarDay {
    fn calendar_day(&self) -> NaiveDate;
}

impl CalendarDay for NaiveDate {
    fn calendar_day(&self) -> NaiveDate {
        *self
    }
}

impl CalendarDay for NaiveDateTime {
    fn calendar_day(&self) -> NaiveDate {
        self.date()
    }
}

impl Batch {
    /// Keep the rows first seen on `day`.
    #[must_use]
    pub fn filter_by_day(self, day: impl CalendarDay) -> Batch {
        let day = day.calendar_day();
        self.retain_rows(|r| r.day() == day)
    }
}

/// Lazily restrict every batch of `batches` to rows first seen on `day`.
pub fn filter_by_day<I>(batches: I, day: impl CalendarDay) -> impl Iterator<Item = Result<Batch>>
where
    I: IntoIterator<Item = Result<Batch>>,
{
    let day = day.calendar_day();
    batches
        .into_iter()
        .map(move |batch| batch.map(|b| b.filter_by_day(day)))
}

/// Lazily restrict every batch of `batches` to rows matching `predicate`.
pub fn filter_rows<I, F>(batches: I, mut predicate: F) -> impl Iterator<Item = Result<Batch>>
where
    I: IntoIterator<Item = Result<Batch>>,
    F: FnMut(&FlowRecord) -> bool,
{
    batches
        .into_iter()
        .map(move |batch| batch.map(|b| b.retain_rows(&mut predicate)))
}

/// Method-call form of the sequence filters.
pub trait BatchStreamExt: Iterator<Item = Result<Batch>> + Sized {
    fn filter_by_day(self, day: impl CalendarDay) -> impl Iterator<Item = Result<Batch>> {
        filter_by_day(self, day)
    }

    fn filter_rows<F>(self, predicate: F) -> impl Iterator<Item = Result<Batch>>
    where
        F: FnMut(&FlowRecord) -> bool,
    {
        filter_rows(self, predicate)
    }
}

impl<I: Iterator<Item = Result<Batch>>> BatchStreamExt for I {}

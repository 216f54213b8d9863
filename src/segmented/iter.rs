use std::iter::FusedIterator;

use super::directory::SegmentView;
use crate::element::Element;

/// Iterator over the elements of a [`SegmentedArray`](super::SegmentedArray).
///
/// Crossing a segment boundary costs one pointer load; the iterator never
/// copies segment contents. Both ends may be consumed.
#[derive(Clone)]
pub struct Iter<'a, T> {
    segments: std::slice::Iter<'a, SegmentView<T>>,
    front: std::slice::Iter<'a, T>,
    back: std::slice::Iter<'a, T>,
    remaining: usize,
}

impl<'a, T: Element> Iter<'a, T> {
    pub(crate) fn new(
        segments: &'a [SegmentView<T>],
        first_offset: usize,
        remaining: usize,
    ) -> Self {
        let empty: &'a [T] = &[];
        let mut segments = segments.iter();
        let front = segments
            .next()
            .map_or(empty.iter(), |segment| segment.as_slice()[first_offset..].iter());
        Self {
            segments,
            front,
            back: empty.iter(),
            remaining,
        }
    }
}

impl<T: Element> Iterator for Iter<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(&value) = self.front.next() {
                self.remaining -= 1;
                return Some(value);
            }
            match self.segments.next() {
                Some(segment) => self.front = segment.as_slice().iter(),
                None => {
                    let &value = self.back.next()?;
                    self.remaining -= 1;
                    return Some(value);
                }
            }
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Element> DoubleEndedIterator for Iter<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(&value) = self.back.next_back() {
                self.remaining -= 1;
                return Some(value);
            }
            match self.segments.next_back() {
                Some(segment) => self.back = segment.as_slice().iter(),
                None => {
                    let &value = self.front.next_back()?;
                    self.remaining -= 1;
                    return Some(value);
                }
            }
        }
    }
}

impl<T: Element> ExactSizeIterator for Iter<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<T: Element> FusedIterator for Iter<'_, T> {}

/// A read position over a strictly ascending sequence.
///
/// The merge engine only ever reads the element under the cursor and steps
/// forward, so any sorted source can take part in a merge by implementing
/// these two methods.
///
/// # Laws
///
/// After `advance`, `current` is either `None` or strictly greater than the
/// value it returned before. Once `current` returns `None` it keeps doing so.
pub trait SortedCursor<T> {
    /// The element under the cursor, or `None` once the sequence is exhausted.
    fn current(&self) -> Option<T>;

    /// Moves to the next element.
    fn advance(&mut self);
}

impl<T, C: SortedCursor<T> + ?Sized> SortedCursor<T> for &mut C {
    #[inline]
    fn current(&self) -> Option<T> {
        (**self).current()
    }

    #[inline]
    fn advance(&mut self) {
        (**self).advance();
    }
}

/// Adapts an iterator into a [`SortedCursor`] by buffering one element.
///
/// # Examples
///
/// ```rust
/// use segvec::merge::{IterCursor, SortedCursor};
///
/// let mut cursor = IterCursor::new([1, 4, 9]);
/// assert_eq!(cursor.current(), Some(1));
/// cursor.advance();
/// assert_eq!(cursor.current(), Some(4));
/// ```
#[derive(Debug, Clone)]
pub struct IterCursor<I: Iterator> {
    iter: I,
    current: Option<I::Item>,
}

impl<I: Iterator> IterCursor<I> {
    /// Positions a cursor on the first element of `iter`.
    pub fn new<S>(iter: S) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        let mut iter = iter.into_iter();
        let current = iter.next();
        Self { iter, current }
    }
}

impl<I> SortedCursor<I::Item> for IterCursor<I>
where
    I: Iterator,
    I::Item: Copy,
{
    #[inline]
    fn current(&self) -> Option<I::Item> {
        self.current
    }

    #[inline]
    fn advance(&mut self) {
        if self.current.is_some() {
            self.current = self.iter.next();
        }
    }
}

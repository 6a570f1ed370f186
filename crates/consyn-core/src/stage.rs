//! Lazy pipeline stages.
//!
//! Every step of ingest and synthesis is a [`Stage`]: it turns an input
//! iterator into an output iterator and only does work when the consumer pulls.
//! Stages hold the state that must survive between items (slice buffers,
//! output buffers, open files) and lend it to the iterator they return, so a
//! stage can be driven once per run and inspected afterwards.
//!
//! ```ignore
//! let mut ingest = reader.then(segmenter);
//! for slice in ingest.transform(blocks) {
//!     let slice = slice?;
//! }
//! ```

/// A lazy sequence transform.
pub trait Stage {
    type Input;
    type Output;

    /// Wrap `input` in an iterator that applies this stage on demand.
    ///
    /// Nothing is read from `input` until the returned iterator is polled;
    /// dropping it early leaves upstream items unread.
    fn transform<'a, I>(&'a mut self, input: I) -> Box<dyn Iterator<Item = Self::Output> + 'a>
    where
        I: Iterator<Item = Self::Input> + 'a;

    /// Feed this stage's output into `next`.
    fn then<B>(self, next: B) -> Chain<Self, B>
    where
        Self: Sized,
        B: Stage<Input = Self::Output>,
    {
        Chain {
            first: self,
            second: next,
        }
    }
}

/// Two stages run back to back; built by [`Stage::then`].
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A, B> Chain<A, B> {
    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A, B> Stage for Chain<A, B>
where
    A: Stage,
    B: Stage<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn transform<'a, I>(&'a mut self, input: I) -> Box<dyn Iterator<Item = Self::Output> + 'a>
    where
        I: Iterator<Item = Self::Input> + 'a,
    {
        let intermediate = self.first.transform(input);
        self.second.transform(intermediate)
    }
}

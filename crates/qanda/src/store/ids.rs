//! Record id generation for the local stores.

use std::fmt;
use std::sync::Mutex;

use ulid::Generator;

use crate::error::{Error, Result};

/// Hands out ULIDs that sort in the order they were generated.
///
/// Ids generated within the same millisecond are incremented rather than
/// randomized, so lexical order always equals insertion order.
#[derive(Default)]
pub struct IdGenerator {
    inner: Mutex<Generator>,
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

impl IdGenerator {
    /// Create a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next id.
    ///
    /// # Errors
    ///
    /// Returns an error if more ids were requested in one millisecond than the
    /// random component can hold.
    pub fn next_id(&self) -> Result<String> {
        let mut generator = self
            .inner
            .lock()
            .map_err(|_| Error::internal("id generator lock poisoned"))?;
        generator
            .generate()
            .map(|ulid| ulid.to_string())
            .map_err(|e| Error::internal(format!("id generation failed: {e}")))
    }
}

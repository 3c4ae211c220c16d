//! Positional arguments handed to a chain factory.

use std::any::{Any, type_name};
use std::fmt;

use datapipe_types::{PipeError, PipeResult};

/// Ordered, type-erased arguments for a chain factory.
///
/// Factories take each argument out by position and type:
///
/// ```
/// use datapipe_core::ChainArgs;
///
/// let mut args = ChainArgs::new().with(3usize).with("label".to_string());
/// assert_eq!(args.take::<usize>(0).unwrap(), 3);
/// assert_eq!(args.take::<String>(1).unwrap(), "label");
/// assert!(args.take::<usize>(0).is_err()); // already taken
/// ```
#[derive(Default)]
pub struct ChainArgs {
    op: String,
    positional: Vec<Option<Box<dyn Any + Send>>>,
}

impl ChainArgs {
    /// Create empty args.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument (builder style).
    pub fn with<A: Any + Send>(mut self, value: A) -> Self {
        self.push(value);
        self
    }

    /// Append an argument.
    pub fn push<A: Any + Send>(&mut self, value: A) {
        self.positional.push(Some(Box::new(value)));
    }

    /// Number of positional arguments, taken or not.
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Move the argument at `index` out, checking its type.
    pub fn take<A: Any>(&mut self, index: usize) -> PipeResult<A> {
        let given = self.positional.len();
        let op = &self.op;
        let slot = self
            .positional
            .get_mut(index)
            .ok_or_else(|| arg_error(op, index, format!("missing, {given} given")))?;

        let boxed = slot
            .take()
            .ok_or_else(|| arg_error(op, index, "already taken".to_string()))?;

        match boxed.downcast::<A>() {
            Ok(value) => Ok(*value),
            Err(original) => {
                // Put it back so a retry with the right type still works.
                *slot = Some(original);
                Err(arg_error(op, index, format!("expected {}", type_name::<A>())))
            }
        }
    }

    /// Like [`take`](Self::take), but a missing argument yields `None`.
    pub fn take_opt<A: Any>(&mut self, index: usize) -> PipeResult<Option<A>> {
        if index >= self.positional.len() {
            return Ok(None);
        }
        self.take(index).map(Some)
    }

    /// Record which operation these args are for, so errors can name it.
    pub(crate) fn for_op(mut self, name: &str) -> Self {
        self.op = name.to_string();
        self
    }
}

fn arg_error(op: &str, index: usize, reason: String) -> PipeError {
    PipeError::ChainArgument {
        name: op.to_string(),
        index,
        reason,
    }
}

impl fmt::Debug for ChainArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainArgs")
            .field("op", &self.op)
            .field("len", &self.positional.len())
            .finish()
    }
}

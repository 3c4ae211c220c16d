//! Producer lifecycle state and diagnostic naming.

/// Where a single-pass producer is in its lifecycle.
///
/// Transitions only ever go forward: `Active` to `Exhausted` or `Failed`.
/// Pulling in either terminal state has no side effects and always reports
/// end-of-sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    /// Items may still be produced.
    Active,
    /// End-of-sequence was reached normally.
    Exhausted,
    /// A failure was reported; the producer will not restart.
    Failed,
}

impl ProducerState {
    /// True once the producer can never yield another item.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProducerState::Active)
    }
}

impl std::fmt::Display for ProducerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProducerState::Active => write!(f, "active"),
            ProducerState::Exhausted => write!(f, "exhausted"),
            ProducerState::Failed => write!(f, "failed"),
        }
    }
}

/// The bare name of `T`: no module path, no generic parameters.
///
/// `datapipe_core::mapper::ConcurrentMapper<Foo, Bar, u32>` becomes
/// `ConcurrentMapper`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    shorten(std::any::type_name::<T>())
}

fn shorten(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("alloc::string::String", "String")]
    #[case("i32", "i32")]
    #[case("my_crate::stage::Flatten<alloc::vec::Vec<u8>>", "Flatten")]
    #[case("a::b::Outer<c::Inner<d::Deep>, e::Other>", "Outer")]
    fn test_shorten(#[case] full: &'static str, #[case] expected: &str) {
        assert_eq!(shorten(full), expected);
    }

    #[test]
    fn test_short_type_name_of_local_type() {
        struct Piper;
        assert_eq!(short_type_name::<Piper>(), "Piper");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ProducerState::Active.is_terminal());
        assert!(ProducerState::Exhausted.is_terminal());
        assert!(ProducerState::Failed.is_terminal());
        assert_eq!(ProducerState::Failed.to_string(), "failed");
    }
}

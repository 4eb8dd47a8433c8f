//! Canonical job status.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generates the status enum, its tag table, and one predicate per state
/// from the single list below, so a new state only has to be added in one
/// place.
macro_rules! states {
    ($($(#[$doc:meta])* $variant:ident => ($tag:literal, $is:ident)),+ $(,)?) => {
        /// The state of a submitted job, as observed at query time.
        ///
        /// States are facts reported by a backend, not steps of an internal
        /// state machine; no transition table is enforced. The declaration
        /// order is meaningful: it is the precedence used when aggregating a
        /// job array's parent status from its tasks, so do not sort it.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(rename_all = "snake_case")]
        pub enum Status {
            $($(#[$doc])* $variant),+
        }

        impl Status {
            /// Every canonical state, in precedence order.
            pub const ALL: &'static [Status] = &[$(Status::$variant),+];

            /// The canonical string tag for this state.
            pub fn tag(self) -> &'static str {
                match self {
                    $(Status::$variant => $tag),+
                }
            }

            $(
                pub fn $is(self) -> bool {
                    matches!(self, Status::$variant)
                }
            )+
        }

        impl FromStr for Status {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok(Status::$variant),)+
                    other => Err(Error::UnknownState(other.to_string())),
                }
            }
        }
    };
}

states! {
    /// The state cannot be determined from backend data.
    Undetermined => ("undetermined", is_undetermined),
    /// No longer present in the backend's active table, whether it
    /// succeeded or failed.
    Completed => ("completed", is_completed),
    /// Waiting, administratively blocked from running.
    QueuedHeld => ("queued_held", is_queued_held),
    /// Waiting, eligible to run.
    Queued => ("queued", is_queued),
    Running => ("running", is_running),
    /// Temporarily paused by the user, the system, or an administrator.
    Suspended => ("suspended", is_suspended),
}

impl Status {
    /// Membership test against an arbitrary tag.
    ///
    /// Unlike [`Status::from_str`], an unrecognized tag is not an error; it
    /// simply matches no state. This makes the test safe to use with tags
    /// this library does not know by name.
    pub fn matches_tag(self, tag: &str) -> bool {
        self.tag() == tag
    }

    /// Aggregate status for a set of tasks: the precedence-maximum, or
    /// `None` for an empty set.
    pub fn aggregate<I>(statuses: I) -> Option<Status>
    where
        I: IntoIterator<Item = Status>,
    {
        statuses.into_iter().max()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl PartialEq<str> for Status {
    fn eq(&self, other: &str) -> bool {
        self.tag() == other
    }
}

impl PartialEq<&str> for Status {
    fn eq(&self, other: &&str) -> bool {
        self.tag() == *other
    }
}

impl PartialEq<Status> for &str {
    fn eq(&self, other: &Status) -> bool {
        *self == other.tag()
    }
}

//! Domain enumerations shared by the entities, core logic and API layer.
//!
//! The database stores these as lowercase strings (see the `String` columns in
//! [`crate::entities`]); the helpers here convert in both directions and reject
//! unknown values with [`Error::BadRequest`].

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored string form.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(Error::bad_request(format!(
                        concat!("Unknown ", stringify!($name), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

string_enum! {
    /// Household role. Ordered from most to least privileged.
    Role {
        /// Full control, including deleting the household
        Owner => "owner",
        /// Manages members, invitations and access requests
        Admin => "admin",
        /// Regular household member
        Member => "member",
        /// Temporary carer: can log activities and feedings
        Sitter => "sitter",
    }
}

impl Role {
    const fn rank(self) -> u8 {
        match self {
            Self::Owner => 3,
            Self::Admin => 2,
            Self::Member => 1,
            Self::Sitter => 0,
        }
    }

    /// Whether this role grants at least the privileges of `required`.
    #[must_use]
    pub const fn at_least(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }
}

string_enum! {
    /// Lifecycle of an [`crate::entities::invitation`] row.
    InvitationStatus {
        /// Awaiting a response
        Pending => "pending",
        /// Invitee joined the household
        Accepted => "accepted",
        /// Invitee declined
        Declined => "declined",
        /// Seven days passed without a response
        Expired => "expired",
    }
}

string_enum! {
    /// Lifecycle of an [`crate::entities::access_request`] row.
    AccessRequestStatus {
        /// Awaiting an admin decision
        Pending => "pending",
        /// Requester was added as a member
        Approved => "approved",
        /// Request was rejected
        Denied => "denied",
    }
}

string_enum! {
    /// Kind of loggable or schedulable activity.
    ActivityKind {
        /// Walk
        Walk => "walk",
        /// Ad-hoc feeding (scheduled feedings live in feeding schedules)
        Feeding => "feeding",
        /// Play session
        Play => "play",
        /// Grooming
        Grooming => "grooming",
        /// Training
        Training => "training",
        /// Vet visit
        VetVisit => "vet_visit",
        /// Medication given
        Medication => "medication",
        /// Anything else
        Other => "other",
    }
}

string_enum! {
    /// Type of health record.
    HealthRecordType {
        /// Vet visit
        VetVisit => "vet_visit",
        /// Vaccination; may carry a vaccine name and next-due date
        Vaccination => "vaccination",
        /// Routine checkup
        Checkup => "checkup",
        /// Surgery or other procedure
        Procedure => "procedure",
    }
}

impl HealthRecordType {
    /// Human readable name used as a fallback calendar title and finance category.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::VetVisit => "Vet Visit",
            Self::Vaccination => "Vaccination",
            Self::Checkup => "Checkup",
            Self::Procedure => "Procedure",
        }
    }
}

string_enum! {
    /// Expense category.
    ExpenseCategory {
        /// Food and treats
        Food => "food",
        /// Veterinary bills
        Vet => "vet",
        /// Grooming
        Grooming => "grooming",
        /// Toys, bedding, equipment
        Supplies => "supplies",
        /// Insurance premiums
        Insurance => "insurance",
        /// Medication
        Medication => "medication",
        /// Boarding and sitting
        Boarding => "boarding",
        /// Training classes
        Training => "training",
        /// Anything else
        Other => "other",
    }
}

impl ExpenseCategory {
    /// Human readable name used as the finance category. Veterinary expenses share
    /// the "Vet Visit" line with billed vet-visit health records.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Vet => "Vet Visit",
            Self::Grooming => "Grooming",
            Self::Supplies => "Supplies",
            Self::Insurance => "Insurance",
            Self::Medication => "Medication",
            Self::Boarding => "Boarding",
            Self::Training => "Training",
            Self::Other => "Other",
        }
    }
}

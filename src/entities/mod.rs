//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod access_request;
pub mod activity;
pub mod expense;
pub mod feeding_log;
pub mod feeding_schedule;
pub mod health_record;
pub mod household;
pub mod invitation;
pub mod medication;
pub mod member;
pub mod pet;

// Re-export specific types to avoid conflicts
pub use access_request::{Entity as AccessRequest, Model as AccessRequestModel};
pub use activity::{Entity as Activity, Model as ActivityModel};
pub use expense::{Entity as Expense, Model as ExpenseModel};
pub use feeding_log::{Entity as FeedingLog, Model as FeedingLogModel};
pub use feeding_schedule::{Entity as FeedingSchedule, Model as FeedingScheduleModel};
pub use health_record::{Entity as HealthRecord, Model as HealthRecordModel};
pub use household::{Entity as Household, Model as HouseholdModel};
pub use invitation::{Entity as Invitation, Model as InvitationModel};
pub use medication::{Entity as Medication, Model as MedicationModel};
pub use member::{Entity as Member, Model as MemberModel};
pub use pet::{Entity as Pet, Model as PetModel};

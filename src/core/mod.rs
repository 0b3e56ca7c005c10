/// Access requests by join code
pub mod access_request;

/// Activity logging, scheduling and completion
pub mod activity;

/// Calendar month view and upcoming list
pub mod calendar;

/// Household dashboard aggregation
pub mod dashboard;

/// Month arithmetic shared by calendar, finance and expenses
pub mod dates;

/// Expense CRUD
pub mod expense;

/// Feeding schedules and completion logs
pub mod feeding;

/// Finance summary and spending trend
pub mod finance;

/// Health records and medications
pub mod health;

/// Household lifecycle and join codes
pub mod household;

/// Invitations by token
pub mod invitation;

/// Member listing, role changes and removal
pub mod member;

/// Membership resolution and role checks
pub mod membership;

/// Pet CRUD and avatars
pub mod pet;

/// Input normalisation helpers
pub mod validation;

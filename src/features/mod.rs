pub mod billing;
pub mod cron;
pub mod expenses;
pub mod notifications;
pub mod subscriptions;

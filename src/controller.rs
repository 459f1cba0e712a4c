pub mod posts;
pub mod subscriptions;

pub mod consumption_logs;
pub mod notifications;
pub mod preferences;

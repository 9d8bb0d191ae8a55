pub mod db;
pub mod notifications;
pub mod payment;
pub mod repositories;

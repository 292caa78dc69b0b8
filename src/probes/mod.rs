pub mod access_control;
pub mod admin_saas;
pub mod browser_access;
pub mod clients;
pub mod email_verification;
pub mod health_check;
pub mod payments;
pub mod service_orders;
pub mod whatsapp;


mod browser_access;
mod service_orders;
mod whatsapp;

// server/src/web/handlers/mod.rs

pub mod command_handlers;
pub mod order_handlers;
pub mod report_handlers;
pub mod webhook_handlers;

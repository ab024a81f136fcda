pub mod caption_flow;
pub mod caption_service;
pub mod compositor;
pub mod error;

pub mod axum_handler;
pub mod caption_client;
pub mod config;
pub mod error;
pub mod font_painter;
pub mod gemini_client;
pub mod image_processor;
